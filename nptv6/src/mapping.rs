//! The [`Mapping`] entity: a bijection between an internal and an external
//! prefix, bound to one interface.

use std::net::Ipv6Addr;

use nptv6_packet::prefix;

/// A single `(interface, internal_prefix, external_prefix, prefix_len)`
/// binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub(crate) interface: Interface,
    pub(crate) internal_prefix: Ipv6Addr,
    pub(crate) external_prefix: Ipv6Addr,
    pub(crate) prefix_len: u8,
}

/// An interface name. The kernel module this crate is modeled on bounds
/// these to `IFNAMSIZ` (16 bytes including the nul terminator); this carries
/// the same ceiling without committing to a fixed-size buffer.
pub const MAX_INTERFACE_LEN: usize = 15;

/// An interface identifier, fixed-capacity to mirror `IFNAMSIZ` without
/// heap-allocating one string per mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interface {
    buf: [u8; MAX_INTERFACE_LEN],
    len: u8,
}

impl Interface {
    pub fn new(name: &str) -> Result<Self, crate::error::MappingError> {
        if name.is_empty() || name.len() > MAX_INTERFACE_LEN {
            return Err(crate::error::MappingError::Invalid);
        }

        let mut buf = [0u8; MAX_INTERFACE_LEN];
        buf[..name.len()].copy_from_slice(name.as_bytes());

        Ok(Self {
            buf,
            len: name.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        #[allow(clippy::expect_used, reason = "constructed only from valid UTF-8 in new()")]
        std::str::from_utf8(&self.buf[..self.len as usize]).expect("constructed from valid str")
    }
}

impl std::fmt::Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mapping {
    pub fn new(
        interface: Interface,
        internal_prefix: Ipv6Addr,
        external_prefix: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<Self, crate::error::MappingError> {
        if prefix_len > 128 {
            return Err(crate::error::MappingError::Invalid);
        }

        Ok(Self {
            interface,
            internal_prefix,
            external_prefix,
            prefix_len,
        })
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    pub fn internal_prefix(&self) -> Ipv6Addr {
        self.internal_prefix
    }

    pub fn external_prefix(&self) -> Ipv6Addr {
        self.external_prefix
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn matches_internal(&self, addr: Ipv6Addr) -> bool {
        prefix::matches(addr, self.internal_prefix, self.prefix_len)
    }

    pub fn matches_external(&self, addr: Ipv6Addr, iface: Interface) -> bool {
        self.interface == iface && prefix::matches(addr, self.external_prefix, self.prefix_len)
    }

    pub fn to_external(&self, addr: Ipv6Addr) -> Ipv6Addr {
        prefix::rewrite(addr, self.external_prefix, self.prefix_len)
    }

    pub fn to_internal(&self, addr: Ipv6Addr) -> Ipv6Addr {
        prefix::rewrite(addr, self.internal_prefix, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlong_interface_name() {
        assert!(Interface::new("this-name-is-way-too-long-for-ifnamsiz").is_err());
    }

    #[test]
    fn rejects_out_of_range_prefix_len() {
        let iface = Interface::new("eth0").unwrap();
        let err = Mapping::new(iface, Ipv6Addr::UNSPECIFIED, Ipv6Addr::UNSPECIFIED, 129)
            .unwrap_err();

        assert_eq!(err, crate::error::MappingError::Invalid);
    }

    #[test]
    fn round_trips_prefix_rewrite() {
        let iface = Interface::new("eth0").unwrap();
        let internal: Ipv6Addr = "2001:db8:1::".parse().unwrap();
        let external: Ipv6Addr = "2001:db8:2::".parse().unwrap();
        let mapping = Mapping::new(iface, internal, external, 64).unwrap();

        let addr: Ipv6Addr = "2001:db8:1::a".parse().unwrap();
        assert!(mapping.matches_internal(addr));

        let rewritten = mapping.to_external(addr);
        assert_eq!(rewritten, "2001:db8:2::a".parse::<Ipv6Addr>().unwrap());
        assert!(mapping.matches_external(rewritten, iface));
    }
}
