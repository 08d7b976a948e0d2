use chrono::FixedOffset;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Offset the flight logs were recorded in (China Standard Time).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// How ingestion resolves a file pattern that matches more than one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileMatchPolicy {
    /// Use the lexicographically first match and warn about the rest.
    #[default]
    First,
    /// Refuse to load the stream.
    Error,
    /// Concatenate every match and re-sort by timestamp.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub utc_offset_hours: i32,
    pub on_multiple_files: FileMatchPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            on_multiple_files: FileMatchPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new(
        utc_offset_hours: i32,
        on_multiple_files: FileMatchPolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            utc_offset_hours,
            on_multiple_files,
        };
        config.offset()?;
        Ok(config)
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        if !(-23..=23).contains(&self.utc_offset_hours) {
            return Err(ConfigError::OffsetOutOfRange(self.utc_offset_hours));
        }
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or(ConfigError::OffsetOutOfRange(self.utc_offset_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offset_is_utc_plus_eight() {
        let offset = AnalysisConfig::default().offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn rejects_offsets_beyond_a_day() {
        assert_eq!(
            AnalysisConfig::new(24, FileMatchPolicy::First),
            Err(ConfigError::OffsetOutOfRange(24))
        );
        assert!(AnalysisConfig::new(-5, FileMatchPolicy::Merge).is_ok());
        assert!(AnalysisConfig::new(-23, FileMatchPolicy::First).is_ok());
    }

    #[test]
    fn extreme_offsets_are_rejected_without_overflow() {
        for hours in [i32::MIN, i32::MAX, -24] {
            let config = AnalysisConfig {
                utc_offset_hours: hours,
                on_multiple_files: FileMatchPolicy::First,
            };
            assert_eq!(config.offset(), Err(ConfigError::OffsetOutOfRange(hours)));
            assert!(AnalysisConfig::new(hours, FileMatchPolicy::First).is_err());
        }
    }
}
