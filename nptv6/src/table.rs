//! The per-isolation-domain mapping store.
//!
//! Mappings are few — tens to low thousands — so lookup is a linear scan
//! over an owned vector rather than the radix-tree-with-retry scheme the
//! kernel module this crate is modeled on used; that structure existed to
//! serve lookups from irq context against a tree mutated under RCU, which
//! this scan-a-snapshot design achieves more simply.
//!
//! Writers build a new `Arc<[Mapping]>` and swap it in under a short-held
//! [`parking_lot::Mutex`]; every packet pass takes one [`Snapshot`] (one
//! `Arc` clone) up front and performs every lookup against it, so a single
//! packet never observes a mapping added or removed mid-pass.

use std::net::Ipv6Addr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::MappingError;
use crate::mapping::{Interface, Mapping};

#[derive(Default)]
pub struct MappingTable {
    mappings: Mutex<Arc<[Mapping]>>,
}

/// A consistent view of the table valid for the duration of one packet
/// pass. Cloning the `Arc` is cheap; all lookups against a `Snapshot` see
/// the same set of mappings regardless of concurrent writers.
#[derive(Clone)]
pub struct Snapshot(Arc<[Mapping]>);

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a consistent snapshot of the table for one packet pass.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.mappings.lock().clone())
    }

    /// Adds a mapping. Fails with [`MappingError::Exists`] if
    /// `(interface, internal_prefix, prefix_len)` duplicates an existing
    /// entry.
    pub fn add(&self, mapping: Mapping) -> Result<(), MappingError> {
        let mut guard = self.mappings.lock();

        let duplicate = guard.iter().any(|m| {
            m.interface() == mapping.interface()
                && m.internal_prefix() == mapping.internal_prefix()
                && m.prefix_len() == mapping.prefix_len()
        });

        if duplicate {
            return Err(MappingError::Exists);
        }

        let mut next: Vec<Mapping> = guard.iter().copied().collect();
        next.push(mapping);

        tracing::debug!(interface = %mapping.interface(), internal = %mapping.internal_prefix(), external = %mapping.external_prefix(), len = mapping.prefix_len(), "mapping added");

        *guard = next.into();

        Ok(())
    }

    /// Removes the mapping for `(interface, internal_prefix, prefix_len)`.
    /// Fails with [`MappingError::NotFound`] if no such mapping exists.
    pub fn remove(
        &self,
        interface: Interface,
        internal_prefix: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<(), MappingError> {
        let mut guard = self.mappings.lock();

        let found = guard.iter().any(|m| {
            m.interface() == interface
                && m.internal_prefix() == internal_prefix
                && m.prefix_len() == prefix_len
        });

        if !found {
            return Err(MappingError::NotFound);
        }

        let next: Vec<Mapping> = guard
            .iter()
            .copied()
            .filter(|m| {
                !(m.interface() == interface
                    && m.internal_prefix() == internal_prefix
                    && m.prefix_len() == prefix_len)
            })
            .collect();

        tracing::debug!(%interface, internal = %internal_prefix, len = prefix_len, "mapping removed");

        *guard = next.into();

        Ok(())
    }

    /// Removes every mapping bound to `interface`. Always succeeds,
    /// returning the count removed — dropping an interface with no
    /// mappings is not an error, unlike [`MappingTable::remove`] of a
    /// specific absent mapping.
    pub fn drop_interface(&self, interface: Interface) -> usize {
        let mut guard = self.mappings.lock();

        let (keep, dropped): (Vec<_>, Vec<_>) =
            guard.iter().copied().partition(|m| m.interface() != interface);

        tracing::debug!(%interface, count = dropped.len(), "mappings dropped for interface");

        *guard = keep.into();

        dropped.len()
    }

    /// Removes every mapping in the table. Returns the count removed.
    pub fn drop_all(&self) -> usize {
        let mut guard = self.mappings.lock();
        let count = guard.len();

        tracing::debug!(count, "all mappings dropped");

        *guard = Arc::from(Vec::new());

        count
    }

    pub fn enumerate(&self) -> Vec<Mapping> {
        self.mappings.lock().iter().copied().collect()
    }

    /// An interface is external iff at least one mapping names it.
    pub fn owns_interface(&self, interface: Interface) -> bool {
        self.mappings.lock().iter().any(|m| m.interface() == interface)
    }
}

impl Snapshot {
    /// Interface-agnostic: matches any mapping whose internal prefix
    /// covers `addr`.
    pub fn lookup_internal(&self, addr: Ipv6Addr) -> Option<Mapping> {
        self.0.iter().find(|m| m.matches_internal(addr)).copied()
    }

    /// Matches a mapping whose external prefix covers `addr` AND whose
    /// interface equals `iface`.
    pub fn lookup_external(&self, addr: Ipv6Addr, iface: Interface) -> Option<Mapping> {
        self.0
            .iter()
            .find(|m| m.matches_external(addr, iface))
            .copied()
    }

    /// Whether `iface` is named as the external interface by any mapping
    /// visible in this snapshot.
    pub fn is_external(&self, iface: Interface) -> bool {
        self.0.iter().any(|m| m.interface() == iface)
    }

    /// Matches `addr` against any mapping's external prefix, ignoring
    /// interface — used for proxy NDP responses issued on internal
    /// interfaces on behalf of any mapping.
    pub fn any_external_match(&self, addr: Ipv6Addr) -> Option<Mapping> {
        self.0
            .iter()
            .find(|m| prefix_matches_external(m, addr))
            .copied()
    }
}

fn prefix_matches_external(m: &Mapping, addr: Ipv6Addr) -> bool {
    nptv6_packet::prefix::matches(addr, m.external_prefix(), m.prefix_len())
}
