//! Packet-level primitives for stateless IPv6 prefix translation.
//!
//! This crate owns nothing; every operation borrows the caller's packet
//! buffer for the duration of one translation pass. It provides the
//! address/prefix arithmetic ([`prefix`]), the incremental checksum engine
//! ([`checksum`]), and a mutable packet view ([`packet::Ipv6PacketMut`])
//! that ties the two together against `etherparse`'s parsed headers.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod checksum;
pub mod packet;
pub mod prefix;

pub use packet::{
    embedded_header, set_embedded_destination, set_embedded_source, Ipv6PacketMut, PacketError,
    Transport,
};
