use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identity of a remote device: an opaque transport address plus an
/// optional display name.
///
/// Equality and hashing are address-based only — two peers with the same
/// address are the same device regardless of how the registry labels them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    addr: String,
    name: Option<String>,
}

impl PeerInfo {
    /// A peer known only by address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            name: None,
        }
    }

    /// A peer with a display name from the registry.
    pub fn named(addr: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            name: Some(name.into()),
        }
    }

    /// The transport address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The display name, if the registry supplied one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The host component of the address (everything before the last `:`).
    ///
    /// Addresses without a port separator are their own host.
    pub fn host(&self) -> &str {
        match self.addr.rfind(':') {
            Some(idx) => &self.addr[..idx],
            None => &self.addr,
        }
    }

    /// Does an inbound connection from `remote` belong to this peer?
    ///
    /// Inbound connections carry an ephemeral source port, so matching
    /// compares host components rather than full addresses.
    pub fn matches(&self, remote: &PeerInfo) -> bool {
        self.host() == remote.host()
    }
}

impl PartialEq for PeerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for PeerInfo {}

impl Hash for PeerInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.addr),
            None => f.write_str(&self.addr),
        }
    }
}
