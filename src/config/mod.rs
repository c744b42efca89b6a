// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,

    /// Broadcast capacity per event channel
    pub event_bus_capacity: usize,

    /// World model configuration
    pub world: WorldConfig,

    /// Overlap detection configuration
    pub overlap: OverlapConfig,

    /// Snapshot buffer configuration
    pub snapshots: SnapshotConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            event_bus_capacity: 1024,
            world: WorldConfig::default(),
            overlap: OverlapConfig::default(),
            snapshots: SnapshotConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pitwall"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Check every tunable for values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_bus_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        self.world.validate()?;
        self.overlap.validate()?;

        // Neighbor pruning only looks one bucket either side
        if self.world.bucket_size_meters < self.overlap.overlap_range_meters {
            return Err(ConfigError::BucketSmallerThanOverlapRange {
                bucket: self.world.bucket_size_meters,
                range: self.overlap.overlap_range_meters,
            });
        }
        self.snapshots.validate()
    }
}

/// World model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Spatial hash segment length in meters
    pub bucket_size_meters: f64,

    /// Track length used until telemetry reports one
    pub default_track_length_meters: f64,

    /// Placeholder track width in meters
    pub track_width_meters: f64,

    /// Treat the first and last bucket as neighbors
    pub wrap_buckets: bool,

    /// Keep pit-road cars out of proximity detection
    pub exclude_pit_road: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bucket_size_meters: 500.0,
            default_track_length_meters: 4000.0,
            track_width_meters: 12.0,
            wrap_buckets: true,
            exclude_pit_road: true,
        }
    }
}

impl WorldConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bucket_size_meters > 0.0) {
            return Err(ConfigError::InvalidBucketSize(self.bucket_size_meters));
        }
        if !(self.default_track_length_meters > 0.0) {
            return Err(ConfigError::InvalidTrackLength(
                self.default_track_length_meters,
            ));
        }
        Ok(())
    }
}

/// Overlap and three-wide detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Gap at which the overlap score reaches zero (about 1-2 car lengths)
    pub overlap_range_meters: f64,

    /// Score a disengaged pair must exceed to engage
    pub entry_threshold: f64,

    /// Score an engaged pair must fall below to disengage
    pub exit_threshold: f64,

    /// How long a crossing must hold before the transition is confirmed
    pub min_dwell_ms: u64,

    /// How long a pair with a missing car is kept before eviction
    pub pair_retention_ms: u64,

    /// Score every pair of a trio must exceed
    pub three_wide_threshold: f64,

    /// Minimum time between reports for the same trio
    pub three_wide_cooldown_ms: u64,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            overlap_range_meters: 12.0,
            entry_threshold: 0.4,
            exit_threshold: 0.25,
            min_dwell_ms: 0,
            pair_retention_ms: 5000,
            three_wide_threshold: 0.4,
            three_wide_cooldown_ms: 2000,
        }
    }
}

impl OverlapConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.overlap_range_meters > 0.0) {
            return Err(ConfigError::InvalidOverlapRange(self.overlap_range_meters));
        }
        for (name, value) in [
            ("entry", self.entry_threshold),
            ("exit", self.exit_threshold),
            ("three-wide", self.three_wide_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.exit_threshold >= self.entry_threshold {
            return Err(ConfigError::HysteresisInverted {
                entry: self.entry_threshold,
                exit: self.exit_threshold,
            });
        }
        Ok(())
    }
}

/// Snapshot buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Maximum retained snapshots (1800 at 10 Hz = 180 s)
    pub max_snapshots: usize,

    /// Minimum session time between captures
    pub capture_interval_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_snapshots: 1800,
            capture_interval_ms: 100,
        }
    }
}

impl SnapshotConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_snapshots == 0 {
            return Err(ConfigError::ZeroSnapshotCapacity);
        }
        Ok(())
    }

    /// Retention window implied by capacity and capture rate
    pub fn retention_ms(&self) -> u64 {
        self.max_snapshots as u64 * self.capture_interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshots.retention_ms(), 180_000);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.overlap.exit_threshold = 0.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::HysteresisInverted { entry: 0.4, exit: 0.5 })
        );

        let mut config = Config::default();
        config.world.bucket_size_meters = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBucketSize(0.0)));

        let mut config = Config::default();
        config.overlap.three_wide_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { name: "three-wide", .. })
        ));

        let mut config = Config::default();
        config.world.bucket_size_meters = 5.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::BucketSmallerThanOverlapRange { bucket: 5.0, range: 12.0 })
        );
        config.world.bucket_size_meters = 12.0;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.snapshots.max_snapshots = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSnapshotCapacity));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [overlap]
            overlap_range_meters = 15.0

            [snapshots]
            max_snapshots = 300
            "#,
        )
        .unwrap();

        assert_eq!(config.overlap.overlap_range_meters, 15.0);
        assert_eq!(config.overlap.entry_threshold, 0.4);
        assert_eq!(config.snapshots.max_snapshots, 300);
        assert_eq!(config.world.bucket_size_meters, 500.0);
    }

    #[test]
    fn test_default_path_under_config_dir() {
        let path = Config::default_path();
        assert!(path.ends_with("config.toml"));
        assert!(path.starts_with(Config::config_dir()));
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("pitwall-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(created.snapshots.max_snapshots, loaded.snapshots.max_snapshots);
        assert_eq!(created.world.wrap_buckets, loaded.world.wrap_buckets);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
