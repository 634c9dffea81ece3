//! Synthesizes an ICMPv6 Time Exceeded reply when a packet's hop limit is
//! exhausted on external ingress.
//!
//! Grounded on the original kernel module's `send_time_exceeded`: same
//! bounds on how much of the original packet gets carried back (enough
//! for `traceroute`/MTR to do something useful, never more than fits in a
//! minimum IPv6 MTU).

use std::net::Ipv6Addr;

use nptv6_packet::checksum;

use crate::host::{HostInterfaces, Verdict};
use crate::mapping::Interface;

const ICMPV6_TIME_EXCEEDED: u8 = 3;
const ICMPV6_CODE_HOP_LIMIT_EXCEEDED: u8 = 0;
const ETHERTYPE_IPV6: [u8; 2] = [0x86, 0xDD];

/// Minimum IPv6 MTU (RFC 8200 §5); the reply's total length never exceeds
/// this so it is never itself fragmented.
const MIN_IPV6_MTU: usize = 1280;
const IPV6_HEADER_LEN: usize = 40;
const ICMPV6_HEADER_LEN: usize = 8;

/// Builds and transmits a Time Exceeded reply for `original`, the
/// untranslated packet whose hop limit reached zero on `iface`.
///
/// Returns [`Verdict::Drop`] always: callers drop the triggering packet
/// regardless of whether the reply could be sent, per the original
/// source dropping in both cases.
pub fn generate(
    iface: Interface,
    original_src_mac: [u8; 6],
    original: &[u8],
    host: &dyn HostInterfaces,
) -> Verdict {
    let Some(reply_src) = host.global_address(iface) else {
        tracing::warn!(%iface, "no eligible global address, suppressing time exceeded reply");
        return Verdict::Drop;
    };

    if original.len() < IPV6_HEADER_LEN {
        tracing::trace!(%iface, "original packet too short to extract source address");
        return Verdict::Drop;
    }

    let Ok((original_src, _)) = nptv6_packet::embedded_header(original) else {
        return Verdict::Drop;
    };

    let Some(responder_mac) = host.mac_address(iface) else {
        tracing::warn!(%iface, "no MAC address available, dropping time exceeded reply");
        return Verdict::Drop;
    };

    let frame = build_reply(
        reply_src,
        original_src,
        responder_mac,
        original_src_mac,
        original,
    );

    if host.transmit(iface, &frame).is_err() {
        tracing::warn!(%iface, "failed to transmit time exceeded reply");
    }

    Verdict::Drop
}

fn build_reply(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    original: &[u8],
) -> Vec<u8> {
    let budget = MIN_IPV6_MTU - IPV6_HEADER_LEN - ICMPV6_HEADER_LEN;
    // Bounded above by the MTU budget, below by enough for a useful
    // traceroute hop (IPv6 header + 8 bytes) when that much is available.
    let carried_len = original
        .len()
        .min(budget)
        .max(IPV6_HEADER_LEN + 8)
        .min(original.len());
    let carried = &original[..carried_len];

    let mut icmp = Vec::with_capacity(ICMPV6_HEADER_LEN + carried.len());
    icmp.push(ICMPV6_TIME_EXCEEDED);
    icmp.push(ICMPV6_CODE_HOP_LIMIT_EXCEEDED);
    icmp.extend_from_slice(&[0, 0]); // checksum placeholder
    icmp.extend_from_slice(&[0, 0, 0, 0]); // unused
    icmp.extend_from_slice(carried);

    let icmp_checksum = checksum::compute_icmpv6(src, dst, &icmp);
    icmp[2..4].copy_from_slice(&icmp_checksum.to_be_bytes());

    let mut ipv6 = Vec::with_capacity(IPV6_HEADER_LEN);
    ipv6.push(0x60);
    ipv6.extend_from_slice(&[0, 0, 0]);
    ipv6.extend_from_slice(&(icmp.len() as u16).to_be_bytes());
    ipv6.push(58);
    ipv6.push(64); // hop_limit
    ipv6.extend_from_slice(&src.octets());
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

    fn fake_original(src: Ipv6Addr, dst: Ipv6Addr, payload_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; IPV6_HEADER_LEN + payload_len];
        buf[0] = 0x60;
        buf[6] = 17; // UDP
        buf[7] = 1; // hop limit (about to expire)
        buf[8..24].copy_from_slice(&src.octets());
        buf[24..40].copy_from_slice(&dst.octets());
        buf
    }

    #[test]
    fn carries_at_least_minimum_diagnostic_payload() {
        let src: Ipv6Addr = "2001:db8:2::a".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8:ff::1".parse().unwrap();
        let original = fake_original(src, dst, 8);

        let frame = build_reply(dst, src, [0xaa; 6], [0xbb; 6], &original);
        let icmp_payload = &frame[14 + IPV6_HEADER_LEN + ICMPV6_HEADER_LEN..];

        assert!(icmp_payload.len() >= IPV6_HEADER_LEN + 8);
    }

    #[test]
    fn never_exceeds_minimum_mtu() {
        let src: Ipv6Addr = "2001:db8:2::a".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8:ff::1".parse().unwrap();
        let original = fake_original(src, dst, 2000);

        let frame = build_reply(dst, src, [0xaa; 6], [0xbb; 6], &original);

        assert!(frame.len() - 14 <= MIN_IPV6_MTU);
    }

    #[test]
    fn reply_header_fields() {
        let src: Ipv6Addr = "2001:db8:2::a".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8:ff::1".parse().unwrap();
        let original = fake_original(src, dst, 16);

        let frame = build_reply(dst, src, [0xaa; 6], [0xbb; 6], &original);
        let ipv6 = &frame[14..];

        assert_eq!(ipv6[6], 58);
        assert_eq!(ipv6[7], 64);
        assert_eq!(&ipv6[8..24], &dst.octets());
        assert_eq!(&ipv6[24..40], &src.octets());
        assert_eq!(ipv6[40], ICMPV6_TIME_EXCEEDED);
        assert_eq!(ipv6[41], ICMPV6_CODE_HOP_LIMIT_EXCEEDED);
    }
}
