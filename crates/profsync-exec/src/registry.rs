//! Registry export targets and output file naming.
//!
//! # Design
//! - `export_file_name` is a pure transform: the `HKEY_` prefix is dropped and
//!   characters that are illegal or awkward in file names become `_`.
//! - `plan_exports` guarantees distinct output names for the configured key
//!   list; names are compared case-insensitively because the target
//!   filesystem is, and later collisions gain `_2`, `_3`, ... suffixes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

const HIVE_PREFIX: &str = "HKEY_";
const SUBSTITUTE: char = '_';
const EXTENSION: &str = "reg";

/// One registry key paired with the file it is exported to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryExportTarget {
    key: String,
    file_name: String,
}

impl RegistryExportTarget {
    /// Full registry key path.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Output file name, unique within its plan.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Output file location inside `directory`.
    #[must_use]
    pub fn output_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.file_name)
    }
}

/// Derive the export file name for `key`.
#[must_use]
pub fn export_file_name(key: &str) -> String {
    format!("{}.{EXTENSION}", file_stem(key))
}

/// Pair every key with a distinct output file name, preserving input order.
#[must_use]
pub fn plan_exports(keys: &[String]) -> Vec<RegistryExportTarget> {
    let mut taken = HashSet::new();
    keys.iter()
        .map(|key| {
            let stem = file_stem(key);
            let mut file_name = format!("{stem}.{EXTENSION}");
            let mut suffix = 2_usize;
            while !taken.insert(file_name.to_lowercase()) {
                file_name = format!("{stem}_{suffix}.{EXTENSION}");
                suffix += 1;
            }
            if suffix > 2 {
                warn!(key = %key, file = %file_name, "registry export name collided; using suffixed file name");
            }
            RegistryExportTarget {
                key: key.clone(),
                file_name,
            }
        })
        .collect()
}

fn file_stem(key: &str) -> String {
    let trimmed = key.trim();
    let without_prefix = trimmed
        .get(..HIVE_PREFIX.len())
        .filter(|head| head.eq_ignore_ascii_case(HIVE_PREFIX))
        .map_or(trimmed, |_| &trimmed[HIVE_PREFIX.len()..]);
    without_prefix
        .chars()
        .map(|ch| match ch {
            '\\' | '/' | ':' | ' ' | '*' | '?' | '"' | '<' | '>' | '|' => SUBSTITUTE,
            other if other.is_control() => SUBSTITUTE,
            other => other,
        })
        .collect()
}
