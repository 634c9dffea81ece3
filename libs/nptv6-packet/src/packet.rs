//! A borrowed, mutable view over a single IPv6 packet.
//!
//! [`Ipv6PacketMut`] never allocates and never takes ownership of the
//! underlying bytes: it borrows `&'a mut [u8]` for the duration of one
//! translation pass, validates the headers it needs with `etherparse`'s
//! immutable parsers, then mutates through `etherparse-ext`'s slice
//! wrappers. No packet data is copied in or out.

use std::net::Ipv6Addr;

use etherparse::{IpNumber, Icmpv6Slice, Ipv6HeaderSlice, TcpHeaderSlice, UdpHeaderSlice};
use etherparse_ext::{Icmpv6EchoHeaderSliceMut, Ipv6HeaderSliceMut, TcpHeaderSliceMut, UdpHeaderSliceMut};

use crate::checksum;

/// The upper-layer protocol riding on top of the IPv6 header, to the
/// extent this crate cares about it (checksum field location and, for
/// ICMPv6, message classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
    Icmpv6,
    Other(u8),
}

/// Failure to even parse the IPv6 header out of the buffer.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("buffer too short to contain a valid IPv6 header")]
    Truncated,
    #[error("malformed IPv6 header: {0}")]
    Malformed(String),
}

/// A mutable, borrowed view over one IPv6 packet's bytes.
pub struct Ipv6PacketMut<'a> {
    buf: &'a mut [u8],
    transport: Transport,
    l4_offset: usize,
}

impl<'a> Ipv6PacketMut<'a> {
    /// Parses `buf` as an IPv6 packet, identifying (but not yet reading
    /// into) the upper-layer header.
    pub fn new(buf: &'a mut [u8]) -> Result<Self, PacketError> {
        let header = Ipv6HeaderSlice::from_slice(buf).map_err(|e| match e {
            etherparse::err::ipv6::HeaderSliceError::Len(_) => PacketError::Truncated,
            other => PacketError::Malformed(other.to_string()),
        })?;

        let next_header = header.next_header();
        let l4_offset = header.slice().len();

        let transport = match next_header {
            IpNumber::TCP => Transport::Tcp,
            IpNumber::UDP => Transport::Udp,
            IpNumber::IPV6_ICMP => Transport::Icmpv6,
            other => Transport::Other(other.0),
        };

        Ok(Self {
            buf,
            transport,
            l4_offset,
        })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// The full packet, IPv6 header and payload together.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf
    }

    pub fn source(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.header().get_source())
    }

    pub fn destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.header().get_destination())
    }

    pub fn hop_limit(&self) -> u8 {
        self.header().hop_limit()
    }

    pub fn set_hop_limit(&mut self, hop_limit: u8) {
        self.header_mut().set_hop_limit(hop_limit);
    }

    pub fn decrement_hop_limit(&mut self) {
        let current = self.hop_limit();
        self.set_hop_limit(current.saturating_sub(1));
    }

    /// The upper-layer payload, starting right after the IPv6 header.
    pub fn payload(&self) -> &[u8] {
        &self.buf[self.l4_offset..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.l4_offset..]
    }

    /// ICMPv6 type/code, if this packet carries ICMPv6.
    pub fn icmpv6_type_code(&self) -> Option<(u8, u8)> {
        if self.transport != Transport::Icmpv6 {
            return None;
        }

        let slice = &self.buf[self.l4_offset..];
        let icmp = Icmpv6Slice::from_slice(slice).ok()?;

        Some((icmp.type_u8(), icmp.code_u8()))
    }

    /// Whether this is one of the four ICMPv6 error message types (1-4):
    /// Destination Unreachable, Packet Too Big, Time Exceeded, Parameter
    /// Problem. Informational messages (echo, NDP, MLD, ...) are 128+.
    pub fn is_icmpv6_error(&self) -> bool {
        matches!(self.icmpv6_type_code(), Some((1..=4, _)))
    }

    /// Rewrites the source address, adjusting the upper-layer checksum in
    /// place via [`checksum::update_address`]. A no-op checksum (UDP's
    /// optional zero) is left untouched, matching the dispatch the engine
    /// uses for every address rewrite.
    pub fn set_source(&mut self, new: Ipv6Addr) {
        let old = self.source();
        self.update_l4_checksum_for_address_change(old, new);
        self.header_mut().set_source(new.octets());
    }

    pub fn set_destination(&mut self, new: Ipv6Addr) {
        let old = self.destination();
        self.update_l4_checksum_for_address_change(old, new);
        self.header_mut().set_destination(new.octets());
    }

    fn update_l4_checksum_for_address_change(&mut self, old: Ipv6Addr, new: Ipv6Addr) {
        let l4_offset = self.l4_offset;

        match self.transport {
            Transport::Tcp => {
                if let Ok(mut tcp) = TcpHeaderSliceMut::from_slice(&mut self.buf[l4_offset..]) {
                    let current = read_tcp_checksum(&self.buf[l4_offset..]);
                    let updated = checksum::update_address(current, old, new);
                    tcp.set_checksum(updated);
                }
            }
            Transport::Udp => {
                let current = read_udp_checksum(&self.buf[l4_offset..]);
                if current != 0 {
                    if let Ok(mut udp) = UdpHeaderSliceMut::from_slice(&mut self.buf[l4_offset..]) {
                        let updated = checksum::update_address(current, old, new);
                        udp.set_checksum(updated);
                    }
                }
            }
            Transport::Icmpv6 => {
                if let Ok(mut icmp) =
                    Icmpv6EchoHeaderSliceMut::from_slice(&mut self.buf[l4_offset..])
                {
                    let current = read_icmpv6_checksum(&self.buf[l4_offset..]);
                    let updated = checksum::update_address(current, old, new);
                    icmp.set_checksum(updated);
                }
            }
            Transport::Other(_) => {}
        }
    }

    fn header(&self) -> Ipv6HeaderSlice<'_> {
        #[allow(clippy::expect_used, reason = "length already validated in new()")]
        Ipv6HeaderSlice::from_slice(self.buf).expect("validated in new()")
    }

    fn header_mut(&mut self) -> Ipv6HeaderSliceMut<'_> {
        #[allow(clippy::expect_used, reason = "length already validated in new()")]
        Ipv6HeaderSliceMut::from_slice(self.buf).expect("validated in new()")
    }
}

/// Reads the source/destination of an IPv6 header embedded somewhere else
/// in a buffer (e.g. the copy an ICMPv6 error carries), without going
/// through [`Ipv6PacketMut`] and its upper-layer checksum side effects.
pub fn embedded_header(buf: &[u8]) -> Result<(Ipv6Addr, Ipv6Addr), PacketError> {
    let header = Ipv6HeaderSlice::from_slice(buf).map_err(|e| match e {
        etherparse::err::ipv6::HeaderSliceError::Len(_) => PacketError::Truncated,
        other => PacketError::Malformed(other.to_string()),
    })?;

    Ok((
        Ipv6Addr::from(header.source()),
        Ipv6Addr::from(header.destination()),
    ))
}

/// Rewrites only the IPv6-header address fields at the start of `buf`,
/// with no checksum side effect. Used for the embedded packet inside an
/// ICMPv6 error, whose own upper-layer checksum is not this crate's
/// concern — only the enclosing ICMPv6 checksum is, and the caller folds
/// that delta in separately.
pub fn set_embedded_source(buf: &mut [u8], new: Ipv6Addr) -> Result<(), PacketError> {
    let mut header = Ipv6HeaderSliceMut::from_slice(buf).map_err(|e| match e {
        etherparse::err::ipv6::HeaderSliceError::Len(_) => PacketError::Truncated,
        other => PacketError::Malformed(other.to_string()),
    })?;

    header.set_source(new.octets());
    Ok(())
}

pub fn set_embedded_destination(buf: &mut [u8], new: Ipv6Addr) -> Result<(), PacketError> {
    let mut header = Ipv6HeaderSliceMut::from_slice(buf).map_err(|e| match e {
        etherparse::err::ipv6::HeaderSliceError::Len(_) => PacketError::Truncated,
        other => PacketError::Malformed(other.to_string()),
    })?;

    header.set_destination(new.octets());
    Ok(())
}

fn read_tcp_checksum(slice: &[u8]) -> u16 {
    TcpHeaderSlice::from_slice(slice)
        .map(|s| s.checksum())
        .unwrap_or(0)
}

fn read_udp_checksum(slice: &[u8]) -> u16 {
    UdpHeaderSlice::from_slice(slice)
        .map(|s| s.checksum())
        .unwrap_or(0)
}

fn read_icmpv6_checksum(slice: &[u8]) -> u16 {
    Icmpv6Slice::from_slice(slice)
        .map(|s| s.checksum())
        .unwrap_or(0)
}
