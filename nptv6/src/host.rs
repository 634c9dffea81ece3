//! The boundary between this crate and the host network stack.
//!
//! Routing, forwarding, interface enumeration and link-layer transmission
//! are explicitly out of scope for the translation engine; a host
//! implements [`HostInterfaces`] to supply them.

use std::net::Ipv6Addr;

use crate::mapping::Interface;

/// The outcome of a hook invocation: whether the host should continue
/// delivering the (possibly mutated) packet, or discard it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Drop,
}

/// Host-supplied address and transmission facilities.
///
/// Implementors back this with whatever the host network stack exposes —
/// a netlink query, an interface table, a send-queue handle. This crate
/// never enumerates interfaces or transmits a frame itself.
pub trait HostInterfaces {
    /// The first address on `iface` that is global scope, not tentative,
    /// not deprecated, and not link-local. `None` if no such address
    /// exists.
    fn global_address(&self, iface: Interface) -> Option<Ipv6Addr>;

    /// The link-layer (MAC) address of `iface`, if known.
    fn mac_address(&self, iface: Interface) -> Option<[u8; 6]>;

    /// Hands a fully formed L2+L3+L4 frame to `iface`'s send queue.
    /// Failures are logged by the caller but never retried.
    fn transmit(&self, iface: Interface, frame: &[u8]) -> Result<(), TransmitError>;
}

#[derive(Debug, thiserror::Error)]
#[error("failed to transmit synthesized frame")]
pub struct TransmitError;
