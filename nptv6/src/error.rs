//! Control-surface error kinds.
//!
//! Datapath-only failure modes (truncated packets, allocation failure,
//! missing source address for a synthesized reply) never reach these
//! variants — they resolve to a [`crate::host::Verdict`] instead, the way
//! the kernel module this crate is modeled on returns `NF_ACCEPT`/
//! `NF_DROP` rather than propagating an error code across the hook
//! boundary.

/// Errors raised by [`crate::table::MappingTable`] and the control surface
/// built on top of it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("prefix length mismatch or out of range")]
    Invalid,
    #[error("mapping already exists for this interface and internal prefix")]
    Exists,
    #[error("no matching mapping found")]
    NotFound,
}
