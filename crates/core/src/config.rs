//! Table configuration
//!
//! Tuning knobs for the table index, loadable from TOML:
//!
//! ```toml
//! initial_capacity = 8
//! max_load_factor = 0.75
//! tombstone_compaction_ratio = 0.5
//! ```
//!
//! None of these change observable table semantics; they only decide when
//! the index grows and when deleted entries are compacted away.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest accepted `max_load_factor`
pub const MIN_LOAD_FACTOR: f64 = 0.05;

/// Largest accepted `initial_capacity`
pub const MAX_INITIAL_CAPACITY: usize = 1 << 24;

/// Configuration for a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of entries to reserve up front (default: 8)
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Occupied fraction of index slots that triggers growth (default: 0.75)
    #[serde(default = "default_max_load_factor")]
    pub max_load_factor: f64,
    /// Fraction of dead entries that triggers compaction (default: 0.5)
    #[serde(default = "default_tombstone_compaction_ratio")]
    pub tombstone_compaction_ratio: f64,
}

fn default_initial_capacity() -> usize {
    8
}

fn default_max_load_factor() -> f64 {
    0.75
}

fn default_tombstone_compaction_ratio() -> f64 {
    0.5
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_load_factor: default_max_load_factor(),
            tombstone_compaction_ratio: default_tombstone_compaction_ratio(),
        }
    }
}

impl TableConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` on malformed TOML or out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: TableConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is in range
    pub fn validate(&self) -> Result<()> {
        if !(self.max_load_factor >= MIN_LOAD_FACTOR && self.max_load_factor < 1.0) {
            return Err(Error::invalid_config(format!(
                "max_load_factor must be in [{}, 1), got {}",
                MIN_LOAD_FACTOR, self.max_load_factor
            )));
        }
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(Error::invalid_config(format!(
                "initial_capacity must be at most {}, got {}",
                MAX_INITIAL_CAPACITY, self.initial_capacity
            )));
        }
        if !(self.tombstone_compaction_ratio > 0.0 && self.tombstone_compaction_ratio <= 1.0) {
            return Err(Error::invalid_config(format!(
                "tombstone_compaction_ratio must be in (0, 1], got {}",
                self.tombstone_compaction_ratio
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stratamap table configuration
#
# Entries reserved up front, at most 16777216.
initial_capacity = 8

# Occupied fraction of index slots that triggers growth, in [0.05, 1).
max_load_factor = 0.75

# Fraction of deleted entries that triggers compaction, in (0, 1].
tombstone_compaction_ratio = 0.5
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TableConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_toml_round_trips_to_default() {
        let parsed = TableConfig::from_toml_str(TableConfig::default_toml()).unwrap();
        assert_eq!(parsed, TableConfig::default());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let parsed = TableConfig::from_toml_str("initial_capacity = 64").unwrap();
        assert_eq!(parsed.initial_capacity, 64);
        assert_eq!(parsed.max_load_factor, 0.75);
    }

    #[test]
    fn test_rejects_load_factor_out_of_range() {
        let err = TableConfig::from_toml_str("max_load_factor = 1.5").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("max_load_factor"));
    }

    #[test]
    fn test_rejects_tiny_load_factor() {
        let err = TableConfig::from_toml_str("max_load_factor = 1e-300").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("max_load_factor"));
        assert!(TableConfig::from_toml_str("max_load_factor = 0.05").is_ok());
    }

    #[test]
    fn test_rejects_huge_initial_capacity() {
        let err =
            TableConfig::from_toml_str("initial_capacity = 9223372036854775807").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("initial_capacity"));

        let at_limit = format!("initial_capacity = {}", MAX_INITIAL_CAPACITY);
        assert!(TableConfig::from_toml_str(&at_limit).is_ok());
    }

    #[test]
    fn test_rejects_zero_compaction_ratio() {
        let err = TableConfig::from_toml_str("tombstone_compaction_ratio = 0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = TableConfig::from_toml_str("initial_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
