//! Stateless, bidirectional, prefix-based IPv6 NAT (NPTv6-style) packet
//! translation.
//!
//! A per-isolation-domain [`table::MappingTable`] holds
//! `(interface, internal_prefix, external_prefix, prefix_len)` bindings;
//! [`engine::pre_routing`]/[`engine::post_routing`] are the two hooks a
//! host installs around its routing decision to translate traffic crossing
//! between internal and external interfaces, answer Neighbor Solicitations
//! on behalf of mapped external addresses ([`ndp`]), and generate ICMPv6
//! Time Exceeded replies for hop-limit expiry on external ingress
//! ([`ttl`]). [`control`] is the semantic surface a text or RPC
//! configuration protocol drives.
//!
//! Routing, forwarding, interface enumeration and link-layer transmission
//! are provided by a [`host::HostInterfaces`] implementation; this crate
//! never does any of that itself.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod control;
pub mod engine;
pub mod error;
pub mod host;
pub mod mapping;
pub mod ndp;
pub mod table;
pub mod ttl;

pub use engine::{post_routing, pre_routing, PacketTag};
pub use error::MappingError;
pub use host::{HostInterfaces, TransmitError, Verdict};
pub use mapping::{Interface, Mapping};
pub use table::MappingTable;
