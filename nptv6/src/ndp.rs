//! Proxy Neighbor Discovery: answer NS for mapped external addresses on
//! behalf of the host, so that both the external peer and internal hosts
//! resolving a foreign-looking address get a link-layer answer.
//!
//! Grounded on the original kernel module's `send_neighbor_advertisement`,
//! which builds the NA by hand rather than through a generic packet
//! builder — this crate does the same since the TLLA option isn't
//! something a generic `etherparse::PacketBuilder` call covers.

use std::net::Ipv6Addr;

use nptv6_packet::checksum;

use crate::host::{HostInterfaces, Verdict};
use crate::mapping::Interface;
use crate::table::Snapshot;

const ICMPV6_NEIGHBOR_ADVERTISEMENT: u8 = 136;
const ND_OPT_TARGET_LL_ADDR: u8 = 2;
const ETHERTYPE_IPV6: [u8; 2] = [0x86, 0xDD];

/// Responds to a Neighbor Solicitation for `target` received on `iface`,
/// if some mapping makes `target` ours to answer for.
///
/// Returns [`Verdict::Drop`] whenever a proxy answer was attempted (sent
/// or not, per spec the original NS must not also reach the host's own ND
/// logic once we've decided to answer) and [`Verdict::Accept`] when no
/// mapping covers `target`, letting the host's own stack respond instead.
pub fn handle_solicitation(
    snapshot: &Snapshot,
    iface: Interface,
    iface_is_external: bool,
    solicitor_addr: Ipv6Addr,
    solicitor_mac: [u8; 6],
    target: Ipv6Addr,
    host: &dyn HostInterfaces,
) -> Verdict {
    let matched = if iface_is_external {
        snapshot.lookup_external(target, iface).is_some()
    } else {
        snapshot.any_external_match(target).is_some()
    };

    if !matched {
        return Verdict::Accept;
    }

    let Some(responder_mac) = host.mac_address(iface) else {
        tracing::warn!(%iface, "no MAC address available, dropping solicited NS");
        return Verdict::Drop;
    };

    let frame = build_advertisement(target, solicitor_addr, responder_mac, solicitor_mac);

    if host.transmit(iface, &frame).is_err() {
        tracing::warn!(%iface, %target, "failed to transmit proxy neighbor advertisement");
    } else {
        tracing::debug!(%iface, %target, "answered neighbor solicitation on behalf of mapping");
    }

    Verdict::Drop
}

/// Builds a full Ethernet + IPv6 + ICMPv6 Neighbor Advertisement frame.
fn build_advertisement(
    target: Ipv6Addr,
    dst: Ipv6Addr,
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
) -> Vec<u8> {
    let mut icmp = Vec::with_capacity(32);
    icmp.push(ICMPV6_NEIGHBOR_ADVERTISEMENT);
    icmp.push(0); // code
    icmp.extend_from_slice(&[0, 0]); // checksum placeholder
    icmp.extend_from_slice(&[0x60, 0, 0, 0]); // R=0 S=1 O=1, reserved
    icmp.extend_from_slice(&target.octets());
    icmp.push(ND_OPT_TARGET_LL_ADDR);
    icmp.push(1); // length in units of 8 octets
    icmp.extend_from_slice(&src_mac);

    let icmp_checksum = checksum::compute_icmpv6(target, dst, &icmp);
    icmp[2..4].copy_from_slice(&icmp_checksum.to_be_bytes());

    let mut ipv6 = Vec::with_capacity(40);
    ipv6.push(0x60); // version 6, traffic class high nibble
    ipv6.extend_from_slice(&[0, 0, 0]); // traffic class low nibble + flow label
    ipv6.extend_from_slice(&(icmp.len() as u16).to_be_bytes());
    ipv6.push(58); // next header: ICMPv6
    ipv6.push(255); // hop limit, per RFC 4861
    ipv6.extend_from_slice(&target.octets());
    ipv6.extend_from_slice(&dst.octets());

    let mut frame = Vec::with_capacity(14 + ipv6.len() + icmp.len());
    frame.extend_from_slice(&dst_mac);
    frame.extend_from_slice(&src_mac);
    frame.extend_from_slice(&ETHERTYPE_IPV6);
    frame.extend_from_slice(&ipv6);
    frame.extend_from_slice(&icmp);

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertisement_carries_solicited_override_flags_and_tlla() {
        let target: Ipv6Addr = "2001:db8:2::a".parse().unwrap();
        let dst: Ipv6Addr = "fe80::1".parse().unwrap();
        let src_mac = [0xaa; 6];
        let dst_mac = [0xbb; 6];

        let frame = build_advertisement(target, dst, src_mac, dst_mac);

        assert_eq!(&frame[0..6], &dst_mac);
        assert_eq!(&frame[6..12], &src_mac);
        assert_eq!(&frame[12..14], &ETHERTYPE_IPV6);

        let ipv6 = &frame[14..];
        assert_eq!(ipv6[6], 58); // next header
        assert_eq!(ipv6[7], 255); // hop limit
        assert_eq!(&ipv6[8..24], &target.octets());
        assert_eq!(&ipv6[24..40], &dst.octets());

        let icmp = &ipv6[40..];
        assert_eq!(icmp[0], ICMPV6_NEIGHBOR_ADVERTISEMENT);
        assert_eq!(icmp[4] & 0x60, 0x60); // solicited + override
        assert_eq!(&icmp[8..24], &target.octets());
        assert_eq!(icmp[24], ND_OPT_TARGET_LL_ADDR);
        assert_eq!(icmp[25], 1);
        assert_eq!(&icmp[26..32], &src_mac);
    }
}
