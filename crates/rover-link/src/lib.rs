//! Bidirectional serial connection manager for the rover controller.
//!
//! Maintains a point-to-point link to a single peer device over a
//! stream transport, in either role: initiating (walk an ordered list of
//! dial routes until one connects) or accepting (open the server endpoint
//! and wait for the expected peer). Established sessions carry
//! newline-delimited messages; lost sessions re-establish automatically
//! per [`ReconnectPolicy`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rover_link::{Link, LinkConfig, LinkEvent, PeerInfo, TcpTransport};
//!
//! # async fn example() {
//! let transport = TcpTransport::new("0.0.0.0:7200");
//! let mut channels = Link::spawn(transport, LinkConfig::default());
//!
//! channels.handle.connect(PeerInfo::new("10.0.0.5:7200")).await.unwrap();
//!
//! while let Some(event) = channels.events.recv().await {
//!     match event {
//!         LinkEvent::Connected(peer) => println!("connected to {peer}"),
//!         LinkEvent::DataReceived(line) => println!("rover says: {line}"),
//!         LinkEvent::Disconnected => println!("link lost"),
//!         _ => {}
//!     }
//! }
//! # }
//! ```

mod accept;
mod config;
mod dial;
mod error;
mod frame;
mod peer;
mod permission;
mod runtime;
mod session;
mod stats;
mod supervisor;
mod transport;

pub use config::{ActiveReconnect, DialRoute, LinkConfig, ReconnectPolicy};
pub use error::LinkError;
pub use peer::PeerInfo;
pub use permission::{AlwaysGranted, Permissions};
pub use runtime::{ConnState, Link, LinkChannels, LinkEvent, LinkHandle};
pub use stats::LinkMetrics;
pub use transport::{LinkIo, LinkStream, Listener, TcpTransport, Transport};
