//! Bit-accurate IPv6 prefix matching and rewriting.
//!
//! Mirrors `compare_prefix_with_len`/`remap_address_with_len` from the
//! kernel module this crate's translation semantics are modeled on, but
//! operates on [`Ipv6Addr`] rather than raw `in6_addr` bytes.

use std::net::Ipv6Addr;

/// Returns whether `addr` agrees with `prefix` on the first `len` bits.
///
/// `len == 0` always matches; `len >= 128` requires full equality.
pub fn matches(addr: Ipv6Addr, prefix: Ipv6Addr, len: u8) -> bool {
    let addr = addr.octets();
    let prefix = prefix.octets();

    let bytes = (len / 8) as usize;
    let bits = len % 8;

    if addr[..bytes.min(16)] != prefix[..bytes.min(16)] {
        return false;
    }

    if bits > 0 && bytes < 16 {
        let mask = mask_byte(bits);
        if addr[bytes] & mask != prefix[bytes] & mask {
            return false;
        }
    }

    true
}

/// Returns `addr` with its first `len` bits replaced by `target`'s, the
/// remaining `128 - len` bits (the host suffix) preserved verbatim.
pub fn rewrite(addr: Ipv6Addr, target: Ipv6Addr, len: u8) -> Ipv6Addr {
    let mut out = addr.octets();
    let target = target.octets();

    let bytes = (len / 8) as usize;
    let bits = len % 8;

    out[..bytes.min(16)].copy_from_slice(&target[..bytes.min(16)]);

    if bits > 0 && bytes < 16 {
        let mask = mask_byte(bits);
        out[bytes] = (target[bytes] & mask) | (out[bytes] & !mask);
    }

    Ipv6Addr::from(out)
}

/// `0xFF << (8 - bits)`, i.e. a mask selecting the top `bits` bits of a byte.
fn mask_byte(bits: u8) -> u8 {
    debug_assert!((1..8).contains(&bits));

    0xFFu8 << (8 - bits)
}

/// `fe80::/10`, the link-local unicast range.
pub fn is_link_local(addr: Ipv6Addr) -> bool {
    let o = addr.octets();

    o[0] == 0xfe && (o[1] & 0xc0) == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_length_is_equality() {
        let a: Ipv6Addr = "2001:db8:1::a".parse().unwrap();
        let b: Ipv6Addr = "2001:db8:1::b".parse().unwrap();

        assert!(!matches(a, b, 128));
        assert!(matches(a, a, 128));
    }

    #[test]
    fn zero_length_always_matches() {
        let a: Ipv6Addr = "2001:db8:1::a".parse().unwrap();
        let p: Ipv6Addr = "::".parse().unwrap();

        assert!(matches(a, p, 0));
    }

    #[test]
    fn rewrite_preserves_host_suffix() {
        let addr: Ipv6Addr = "2001:db8:1::dead:beef".parse().unwrap();
        let target: Ipv6Addr = "2001:db8:2::".parse().unwrap();

        let rewritten = rewrite(addr, target, 64);

        assert_eq!(rewritten, "2001:db8:2::dead:beef".parse::<Ipv6Addr>().unwrap());
    }

    #[test]
    fn rewrite_at_64_then_match_against_target() {
        let addr: Ipv6Addr = "2001:db8:1::a".parse().unwrap();
        let internal: Ipv6Addr = "2001:db8:1::".parse().unwrap();
        let external: Ipv6Addr = "2001:db8:2::".parse().unwrap();

        assert!(matches(addr, internal, 64));

        let rewritten = rewrite(addr, external, 64);

        assert!(matches(rewritten, external, 64));
        assert!(!matches(rewritten, internal, 64));
    }

    #[test]
    fn link_local_range() {
        assert!(is_link_local("fe80::1".parse().unwrap()));
        assert!(is_link_local("febf:ffff::1".parse().unwrap()));
        assert!(!is_link_local("fec0::1".parse().unwrap()));
        assert!(!is_link_local("2001:db8::1".parse().unwrap()));
    }

    proptest! {
        #[test]
        fn rewrite_is_bijective_suffix_preserving(
            host_bits in any::<u128>(),
            target in any::<u128>(),
            len in 0u8..=128,
        ) {
            let suffix_mask: u128 = if len == 128 { 0 } else { u128::MAX >> len };

            let addr = Ipv6Addr::from(host_bits);
            let target = Ipv6Addr::from(target);

            let rewritten = rewrite(addr, target, len);

            let rewritten_bits = u128::from(rewritten);
            let addr_bits = u128::from(addr);

            prop_assert_eq!(rewritten_bits & suffix_mask, addr_bits & suffix_mask);
            prop_assert!(matches(rewritten, target, len));
        }

        #[test]
        fn rewrite_roundtrips_back_to_original(
            host_bits in any::<u128>(),
            external in any::<u128>(),
            internal in any::<u128>(),
            len in 0u8..=128,
        ) {
            let addr = Ipv6Addr::from(host_bits);
            let external = Ipv6Addr::from(external);
            let internal = Ipv6Addr::from(internal);

            let out = rewrite(addr, external, len);
            let back = rewrite(out, internal, len);

            prop_assert_eq!(rewrite(addr, internal, len), back);
        }
    }
}
