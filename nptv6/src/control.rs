//! The semantic control surface: `add`/`del`/`drop`/`list`, and the line
//! parser a caller-owned text/batch protocol can drive.
//!
//! The textual syntax itself (where the bytes come from, whether it's a
//! procfs file or a gRPC call) is a host concern; this module only
//! specifies what one line of that syntax means and what it does to a
//! [`MappingTable`].

use std::fmt::Write as _;
use std::net::Ipv6Addr;

use crate::error::MappingError;
use crate::mapping::{Interface, Mapping};
use crate::table::MappingTable;

/// A single write may carry at most this many bytes, mirroring the
/// control-plane's batch write ceiling.
pub const MAX_BATCH_BYTES: usize = 1024 * 1024;

/// Result of applying a multi-line batch: how many lines were accepted
/// versus rejected. Per-line failures do not abort the batch or roll back
/// prior successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchResult {
    pub processed: usize,
    pub errors: usize,
}

/// Applies one control-surface line (`add`/`del`/`drop`) to `table`.
pub fn apply_line(table: &MappingTable, line: &str) -> Result<(), MappingError> {
    let mut words = line.split_whitespace();
    let command = words.next().ok_or(MappingError::Invalid)?;

    match command {
        "add" => {
            let iface = words.next().ok_or(MappingError::Invalid)?;
            let internal = words.next().ok_or(MappingError::Invalid)?;
            let external = words.next().ok_or(MappingError::Invalid)?;

            if words.next().is_some() {
                return Err(MappingError::Invalid);
            }

            let iface = Interface::new(iface)?;
            let (internal_prefix, internal_len) = parse_prefix(internal)?;
            let (external_prefix, external_len) = parse_prefix(external)?;

            if internal_len != external_len {
                return Err(MappingError::Invalid);
            }

            let mapping = Mapping::new(iface, internal_prefix, external_prefix, internal_len)?;
            table.add(mapping)
        }
        "del" => {
            let iface = words.next().ok_or(MappingError::Invalid)?;
            let internal = words.next().ok_or(MappingError::Invalid)?;

            if words.next().is_some() {
                return Err(MappingError::Invalid);
            }

            let iface = Interface::new(iface)?;
            let (internal_prefix, len) = parse_prefix(internal)?;

            table.remove(iface, internal_prefix, len)
        }
        "drop" => {
            let target = words.next().ok_or(MappingError::Invalid)?;

            if words.next().is_some() {
                return Err(MappingError::Invalid);
            }

            if target == "--all" {
                table.drop_all();
                return Ok(());
            }

            let iface = Interface::new(target)?;
            table.drop_interface(iface);
            Ok(())
        }
        _ => Err(MappingError::Invalid),
    }
}

/// Applies a multi-line batch write: blank lines and `#`-prefixed comment
/// lines are skipped; every other line is run through [`apply_line`]
/// independently, with its outcome folded into the running counts rather
/// than aborting the batch.
pub fn apply_batch(table: &MappingTable, text: &str) -> Result<BatchResult, MappingError> {
    if text.len() > MAX_BATCH_BYTES {
        return Err(MappingError::Invalid);
    }

    let mut result = BatchResult::default();

    for line in text.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match apply_line(table, line) {
            Ok(()) => result.processed += 1,
            Err(error) => {
                tracing::debug!(%line, %error, "batch line rejected");
                result.errors += 1;
            }
        }
    }

    Ok(result)
}

/// Renders the current table the way the original `mapping_show` did: a
/// header comment followed by one `<iface> <int>/<L> -> <ext>/<L>` line
/// per mapping.
pub fn render(table: &MappingTable) -> String {
    let mut out = String::from("# IPv6 NAT Mappings\n");

    for mapping in table.enumerate() {
        let _ = writeln!(
            out,
            "{} {}/{} -> {}/{}",
            mapping.interface(),
            mapping.internal_prefix(),
            mapping.prefix_len(),
            mapping.external_prefix(),
            mapping.prefix_len(),
        );
    }

    out
}

fn parse_prefix(text: &str) -> Result<(Ipv6Addr, u8), MappingError> {
    let (addr, len) = text.split_once('/').ok_or(MappingError::Invalid)?;

    let addr: Ipv6Addr = addr.parse().map_err(|_| MappingError::Invalid)?;
    let len: u8 = len.parse().map_err(|_| MappingError::Invalid)?;

    if len > 128 {
        return Err(MappingError::Invalid);
    }

    Ok((addr, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_list_round_trips() {
        let table = MappingTable::new();

        apply_line(&table, "add eth0 2001:db8:1::/64 2001:db8:2::/64").unwrap();

        let rendered = render(&table);
        assert!(rendered.starts_with("# IPv6 NAT Mappings\n"));
        assert!(rendered.contains("eth0 2001:db8:1::/64 -> 2001:db8:2::/64"));
    }

    #[test]
    fn add_rejects_mismatched_prefix_lengths() {
        let table = MappingTable::new();

        let err = apply_line(&table, "add eth0 2001:db8:1::/64 2001:db8:2::/56").unwrap_err();
        assert_eq!(err, MappingError::Invalid);
    }

    #[test]
    fn del_then_readd_succeeds() {
        let table = MappingTable::new();

        apply_line(&table, "add eth0 2001:db8:1::/64 2001:db8:2::/64").unwrap();
        apply_line(&table, "del eth0 2001:db8:1::/64").unwrap();
        apply_line(&table, "add eth0 2001:db8:1::/64 2001:db8:2::/64").unwrap();

        assert_eq!(table.enumerate().len(), 1);
    }

    #[test]
    fn drop_all_clears_every_mapping() {
        let table = MappingTable::new();

        apply_line(&table, "add eth0 2001:db8:1::/64 2001:db8:2::/64").unwrap();
        apply_line(&table, "add eth1 2001:db8:3::/64 2001:db8:4::/64").unwrap();
        apply_line(&table, "drop --all").unwrap();

        assert!(table.enumerate().is_empty());
    }

    #[test]
    fn batch_counts_errors_without_aborting() {
        let table = MappingTable::new();

        let batch = "\
            # comment\n\
            \n\
            add eth0 2001:db8:1::/64 2001:db8:2::/64\n\
            add eth0 2001:db8:1::/64 2001:db8:2::/64\n\
            add eth1 2001:db8:5::/64 2001:db8:6::/64\n\
        ";

        let result = apply_batch(&table, batch).unwrap();

        assert_eq!(result.processed, 2);
        assert_eq!(result.errors, 1);
    }

    #[test]
    fn oversized_batch_is_rejected_wholesale() {
        let table = MappingTable::new();
        let text = "#".repeat(MAX_BATCH_BYTES + 1);

        assert_eq!(apply_batch(&table, &text).unwrap_err(), MappingError::Invalid);
    }
}
