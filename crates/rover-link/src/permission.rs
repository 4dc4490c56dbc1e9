/// Transport authorization seam.
///
/// Whether the operator has granted transport access is decided outside the
/// link (platform permission dialogs, policy, …). The link only checks the
/// answer before any I/O: a denial surfaces as a terminal
/// `ConnectionFailed("permission denied")` event and is never retried.
pub trait Permissions: Send + Sync + 'static {
    /// Has transport access been granted?
    fn transport_allowed(&self) -> bool;
}

/// The default collaborator: access is assumed granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl Permissions for AlwaysGranted {
    fn transport_allowed(&self) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) struct DenyAll;

#[cfg(test)]
impl Permissions for DenyAll {
    fn transport_allowed(&self) -> bool {
        false
    }
}
