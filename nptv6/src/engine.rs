//! The translation engine: classify, look up, rewrite, tag.
//!
//! `pre_routing` is the hook installed ahead of routing decisions;
//! `post_routing` clears the tag `pre_routing` set so it never leaks past
//! this host. Grounded on `nat_hook_func` in the kernel module this is
//! modeled on, restructured as a linear decision sequence instead of a
//! single sprawling function with early returns scattered through nested
//! `if`s.

use std::net::Ipv6Addr;

use nptv6_packet::{packet, Ipv6PacketMut};

use crate::host::{HostInterfaces, Verdict};
use crate::mapping::{Interface, Mapping};
use crate::ndp;
use crate::table::{MappingTable, Snapshot};
use crate::ttl;

const ICMPV6_ECHO_REQUEST: u8 = 128;
const ICMPV6_ECHO_REPLY: u8 = 129;
const ICMPV6_ROUTER_SOLICITATION: u8 = 133;
const ICMPV6_ROUTER_ADVERTISEMENT: u8 = 134;
const ICMPV6_NEIGHBOR_SOLICITATION: u8 = 135;
const ICMPV6_NEIGHBOR_ADVERTISEMENT: u8 = 136;
const ICMPV6_REDIRECT: u8 = 137;

/// Minimum ICMPv6 payload (error header + embedded IPv6 header) needed to
/// recurse into the embedded packet; the spec's "IPv6 + ICMPv6 + IPv6"
/// floor on the *whole* packet, minus the outer IPv6 header already
/// stripped off by the time we're looking at `payload()`.
const MIN_ICMPV6_ERROR_RECURSION_LEN: usize = 8 + 40;

/// A single boolean "already translated in this pass" marker, set on
/// successful rewrite and cleared at post-routing. Carried by the caller
/// alongside the packet the way an skb extension travels with its skb.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PacketTag(bool);

impl PacketTag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0
    }

    fn set(&mut self) {
        self.0 = true;
    }

    pub fn clear(&mut self) {
        self.0 = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Internal,
    External,
}

/// Runs the translation engine on one packet arriving on `iface`.
///
/// `src_mac` is the link-layer source address the frame carried, needed
/// only for the proxy NDP reply's destination MAC; the engine never looks
/// it up itself since link-layer concerns are otherwise the host's.
pub fn pre_routing(
    table: &MappingTable,
    iface: Interface,
    src_mac: [u8; 6],
    tag: &mut PacketTag,
    buf: &mut [u8],
    host: &dyn HostInterfaces,
) -> Verdict {
    if tag.is_set() {
        return Verdict::Accept;
    }

    let snapshot = table.snapshot();

    let mut pkt = match Ipv6PacketMut::new(buf) {
        Ok(pkt) => pkt,
        Err(_) => return Verdict::Accept,
    };

    if nptv6_packet::prefix::is_link_local(pkt.source())
        && nptv6_packet::prefix::is_link_local(pkt.destination())
    {
        return Verdict::Accept;
    }

    let side = if snapshot.is_external(iface) {
        Side::External
    } else {
        Side::Internal
    };

    let is_icmp_error = match pkt.icmpv6_type_code() {
        Some((ICMPV6_NEIGHBOR_SOLICITATION, _)) => {
            return handle_neighbor_solicitation(&pkt, &snapshot, iface, side, src_mac, host);
        }
        Some((
            ICMPV6_NEIGHBOR_ADVERTISEMENT
            | ICMPV6_ROUTER_SOLICITATION
            | ICMPV6_ROUTER_ADVERTISEMENT
            | ICMPV6_REDIRECT,
            _,
        )) => return Verdict::Accept,
        Some((ICMPV6_ECHO_REQUEST | ICMPV6_ECHO_REPLY, _)) => false,
        Some(_) if pkt.is_icmpv6_error() => true,
        Some(_) => return Verdict::Accept,
        None => false,
    };

    if side == Side::External && pkt.hop_limit() <= 1 {
        tracing::debug!(%iface, "hop limit exhausted on external ingress");
        ttl::generate(iface, src_mac, pkt.as_bytes(), host);
        return Verdict::Drop;
    }

    let src = pkt.source();
    let dst = pkt.destination();

    let (m_src, m_dst) = match side {
        Side::External => (
            snapshot.lookup_external(src, iface),
            snapshot.lookup_external(dst, iface),
        ),
        Side::Internal => (snapshot.lookup_internal(src), snapshot.lookup_internal(dst)),
    };

    let rewrote = match (side, is_icmp_error) {
        (Side::External, false) => {
            let Some(m_dst) = m_dst else {
                return Verdict::Accept;
            };

            if let Some(m_src) = m_src {
                pkt.set_source(m_src.to_internal(src));
            }
            pkt.set_destination(m_dst.to_internal(dst));

            true
        }
        (Side::External, true) => {
            let Some(m_dst) = m_dst else {
                return Verdict::Accept;
            };

            recurse_embedded(&mut pkt, side, &snapshot, iface);
            pkt.set_destination(m_dst.to_internal(dst));

            true
        }
        (Side::Internal, false) => {
            let (Some(m_src), Some(m_dst)) = (m_src, m_dst) else {
                return Verdict::Accept;
            };

            pkt.set_source(m_src.to_external(src));
            pkt.set_destination(m_dst.to_external(dst));

            true
        }
        (Side::Internal, true) => {
            let (Some(m_src), Some(m_dst)) = (m_src, m_dst) else {
                return Verdict::Accept;
            };

            recurse_embedded(&mut pkt, side, &snapshot, iface);
            pkt.set_source(m_src.to_external(src));
            pkt.set_destination(m_dst.to_external(dst));

            true
        }
    };

    if rewrote {
        tag.set();
        tracing::trace!(%iface, ?side, "packet translated");
    }

    Verdict::Accept
}

/// Clears the translation tag. Installed at the post-routing hook so the
/// tag never outlives a single traversal of the host.
pub fn post_routing(tag: &mut PacketTag) {
    tag.clear();
}

fn handle_neighbor_solicitation(
    pkt: &Ipv6PacketMut<'_>,
    snapshot: &Snapshot,
    iface: Interface,
    side: Side,
    src_mac: [u8; 6],
    host: &dyn HostInterfaces,
) -> Verdict {
    let Some(target) = read_ns_target(pkt.payload()) else {
        return Verdict::Accept;
    };

    ndp::handle_solicitation(
        snapshot,
        iface,
        side == Side::External,
        pkt.source(),
        src_mac,
        target,
        host,
    )
}

fn read_ns_target(icmpv6_payload: &[u8]) -> Option<Ipv6Addr> {
    if icmpv6_payload.len() < 8 + 16 {
        return None;
    }

    let target: [u8; 16] = icmpv6_payload[8..24].try_into().ok()?;
    Some(Ipv6Addr::from(target))
}

/// Translates the embedded packet an ICMPv6 error carries, folding the
/// address-change deltas into the outer ICMPv6 checksum. A no-op if the
/// error payload is too short to hold a full inner IPv6 header.
fn recurse_embedded(pkt: &mut Ipv6PacketMut<'_>, side: Side, snapshot: &Snapshot, iface: Interface) {
    if pkt.payload().len() < MIN_ICMPV6_ERROR_RECURSION_LEN {
        return;
    }

    let inner_offset = 8; // fixed ICMPv6 error header length (RFC 4443)
    let payload = pkt.payload();
    let inner = &payload[inner_offset..];

    let Ok((inner_src, inner_dst)) = packet::embedded_header(inner) else {
        return;
    };

    let (m_src, m_dst) = match side {
        Side::External => (
            snapshot.lookup_external(inner_src, iface),
            snapshot.lookup_external(inner_dst, iface),
        ),
        Side::Internal => (
            snapshot.lookup_internal(inner_src),
            snapshot.lookup_internal(inner_dst),
        ),
    };

    let mut outer_checksum = read_outer_icmpv6_checksum(pkt.payload());
    let mut touched = false;

    if let Some(m) = m_src {
        let new_addr = rewrite_for_side(side, m, inner_src);
        let inner_mut = &mut pkt.payload_mut()[inner_offset..];
        if packet::set_embedded_source(inner_mut, new_addr).is_ok() {
            outer_checksum = nptv6_packet::checksum::update_address(outer_checksum, inner_src, new_addr);
            touched = true;
        }
    }

    if let Some(m) = m_dst {
        let new_addr = rewrite_for_side(side, m, inner_dst);
        let inner_mut = &mut pkt.payload_mut()[inner_offset..];
        if packet::set_embedded_destination(inner_mut, new_addr).is_ok() {
            outer_checksum = nptv6_packet::checksum::update_address(outer_checksum, inner_dst, new_addr);
            touched = true;
        }
    }

    if touched {
        write_outer_icmpv6_checksum(pkt.payload_mut(), outer_checksum);
    }
}

fn rewrite_for_side(side: Side, mapping: Mapping, addr: Ipv6Addr) -> Ipv6Addr {
    match side {
        Side::External => mapping.to_internal(addr),
        Side::Internal => mapping.to_external(addr),
    }
}

fn read_outer_icmpv6_checksum(icmpv6_message: &[u8]) -> u16 {
    u16::from_be_bytes([icmpv6_message[2], icmpv6_message[3]])
}

fn write_outer_icmpv6_checksum(icmpv6_message: &mut [u8], checksum: u16) {
    icmpv6_message[2..4].copy_from_slice(&checksum.to_be_bytes());
}
