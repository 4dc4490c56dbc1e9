//! Typed message grammar for the rover controller link.
//!
//! The link carries newline-delimited ASCII lines; this crate gives those
//! lines types. Outbound: movement commands and obstacle updates the
//! controller sends to the rover. Inbound: pose and target reports the rover
//! sends back, plus free-form status lines (see [`is_noteworthy`] for the
//! display filter).

mod command;
mod error;
mod filter;
mod message;

pub use command::RobotCommand;
pub use error::ParseError;
pub use filter::is_noteworthy;
pub use message::{Direction, Inbound, ObstacleUpdate, RobotUpdate, TargetUpdate};
