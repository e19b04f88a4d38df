//! Resource limits applied while unpacking untrusted archives.

use std::io::Read;

use serde::Deserialize;

use super::error::{BundleError, BundleResult};

/// Resource limits for unpacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackLimits {
    pub max_archive_bytes: u64,
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
    pub max_entries: usize,
    pub max_name_len: usize,
}

impl Default for UnpackLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: 64 * 1024 * 1024, // 64 MB compressed
            max_entry_bytes: 32 * 1024 * 1024,   // 32 MB per entry
            max_total_bytes: 128 * 1024 * 1024,  // 128 MB uncompressed
            max_entries: 64,
            max_name_len: 256,
        }
    }
}

/// Partial overrides for `UnpackLimits`, as read from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnpackLimitsOverrides {
    pub max_archive_bytes: Option<u64>,
    pub max_entry_bytes: Option<u64>,
    pub max_total_bytes: Option<u64>,
    pub max_entries: Option<usize>,
    pub max_name_len: Option<usize>,
}

impl UnpackLimits {
    /// Apply overrides onto these limits. Only `Some` values override.
    pub fn apply(self, overrides: &UnpackLimitsOverrides) -> Self {
        Self {
            max_archive_bytes: overrides.max_archive_bytes.unwrap_or(self.max_archive_bytes),
            max_entry_bytes: overrides.max_entry_bytes.unwrap_or(self.max_entry_bytes),
            max_total_bytes: overrides.max_total_bytes.unwrap_or(self.max_total_bytes),
            max_entries: overrides.max_entries.unwrap_or(self.max_entries),
            max_name_len: overrides.max_name_len.unwrap_or(self.max_name_len),
        }
    }

    pub(crate) fn check_archive(&self, len: usize) -> BundleResult<()> {
        check("archive size", len as u64, self.max_archive_bytes)
    }

    pub(crate) fn check_entry_count(&self, count: usize) -> BundleResult<()> {
        check("entry count", count as u64, self.max_entries as u64)
    }

    pub(crate) fn check_name(&self, name: &str) -> BundleResult<()> {
        check("entry name length", name.len() as u64, self.max_name_len as u64)
    }
}

fn check(limit: &'static str, actual: u64, max: u64) -> BundleResult<()> {
    if actual > max {
        return Err(BundleError::LimitExceeded { limit, actual, max });
    }
    Ok(())
}

/// Running byte budget for the entries of one archive.
///
/// Declared sizes are reserved before a body is read, then settled against
/// the bytes actually read.
pub(crate) struct EntryBudget {
    limits: UnpackLimits,
    total: u64,
    reserved: u64,
}

impl EntryBudget {
    pub(crate) fn new(limits: UnpackLimits) -> Self {
        Self {
            limits,
            total: 0,
            reserved: 0,
        }
    }

    /// Reserve room for an entry whose header declares `declared` bytes.
    pub(crate) fn reserve(&mut self, declared: u64) -> BundleResult<()> {
        check("entry size", declared, self.limits.max_entry_bytes)?;
        self.total = self.total.saturating_add(declared);
        self.reserved = declared;
        check("total uncompressed size", self.total, self.limits.max_total_bytes)
    }

    /// Read an entry body, stopping one byte past the per-entry limit so an
    /// understated header cannot make us buffer more than that.
    pub(crate) fn read_entry<R: Read>(&self, reader: R) -> std::io::Result<Vec<u8>> {
        let mut data = Vec::new();
        reader
            .take(self.limits.max_entry_bytes.saturating_add(1))
            .read_to_end(&mut data)?;
        Ok(data)
    }

    /// Replace the last reservation with the number of bytes actually read.
    pub(crate) fn consume(&mut self, actual: u64) -> BundleResult<()> {
        check("entry size", actual, self.limits.max_entry_bytes)?;
        self.total = self
            .total
            .saturating_sub(self.reserved)
            .saturating_add(actual);
        self.reserved = 0;
        check("total uncompressed size", self.total, self.limits.max_total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let limits = UnpackLimits::default().apply(&UnpackLimitsOverrides {
            max_entries: Some(3),
            ..Default::default()
        });
        assert_eq!(limits.max_entries, 3);
        assert_eq!(limits.max_entry_bytes, UnpackLimits::default().max_entry_bytes);
    }

    #[test]
    fn test_budget_rejects_total_overflow() {
        let limits = UnpackLimits {
            max_entry_bytes: 10,
            max_total_bytes: 15,
            ..Default::default()
        };
        let mut budget = EntryBudget::new(limits);
        budget.reserve(10).unwrap();
        let err = budget.reserve(10).unwrap_err();
        assert!(matches!(
            err,
            BundleError::LimitExceeded {
                limit: "total uncompressed size",
                ..
            }
        ));
    }

    #[test]
    fn test_read_entry_caps_lying_header() {
        let limits = UnpackLimits {
            max_entry_bytes: 4,
            ..Default::default()
        };
        let mut budget = EntryBudget::new(limits);
        budget.reserve(1).unwrap();
        let data = budget.read_entry(&b"abcdefgh"[..]).unwrap();
        assert_eq!(data.len(), 5);
        let err = budget.consume(data.len() as u64).unwrap_err();
        assert!(matches!(err, BundleError::LimitExceeded { limit: "entry size", .. }));
    }

    #[test]
    fn test_consume_charges_actual_bytes_to_total() {
        let limits = UnpackLimits {
            max_entry_bytes: 100,
            max_total_bytes: 150,
            ..Default::default()
        };
        let mut budget = EntryBudget::new(limits);
        budget.reserve(1).unwrap();
        budget.consume(100).unwrap();
        budget.reserve(1).unwrap();
        let err = budget.consume(100).unwrap_err();
        assert!(matches!(
            err,
            BundleError::LimitExceeded {
                limit: "total uncompressed size",
                actual: 200,
                max: 150,
            }
        ));
    }

    #[test]
    fn test_consume_releases_overstated_reservation() {
        let limits = UnpackLimits {
            max_entry_bytes: 100,
            max_total_bytes: 150,
            ..Default::default()
        };
        let mut budget = EntryBudget::new(limits);
        budget.reserve(100).unwrap();
        budget.consume(10).unwrap();
        budget.reserve(100).unwrap();
        budget.consume(100).unwrap();
    }
}
