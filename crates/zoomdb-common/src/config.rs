//! ZoomDB Config - Configuration Structures
//!
//! Configuration types for all ZoomDB components. Supports loading from
//! TOML files and programmatic construction, with defaults tuned for an
//! interactive plot redrawing every few milliseconds.
//!
//! Key Features:
//! - Tree configuration (fan-out of leaves and internal nodes)
//! - Database configuration (channel auto-creation policy)
//! - Ingest configuration (drain cadence, queue bound)
//! - Viewer configuration (point budget, tailing duration)
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default maximum number of samples per leaf and children per internal node.
pub const DEFAULT_FAN_OUT: usize = 64;

// =============================================================================
// Tree Configuration
// =============================================================================

/// Configuration for the aggregation tree of each series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub fan_out: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            fan_out: DEFAULT_FAN_OUT,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Configuration for the series database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Register unknown channels when they are queried, not only when written.
    pub create_on_query: bool,
    pub tree: TreeConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            create_on_query: true,
            tree: TreeConfig::default(),
        }
    }
}

// =============================================================================
// Ingest Configuration
// =============================================================================

/// Configuration for the producer to database handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub drain_interval_ms: u64,
    /// Bounded queue capacity in messages. `None` means unbounded.
    pub queue_capacity: Option<usize>,
    pub change_buffer: usize,
}

impl IngestConfig {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 10,
            queue_capacity: None,
            change_buffer: 64,
        }
    }
}

// =============================================================================
// Viewer Configuration
// =============================================================================

/// Configuration for the consumer side that renders query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Target number of plottable points, roughly the pixel column count.
    pub point_budget: usize,
    /// Tailing window in seconds.
    pub tail_duration: f64,
    pub refresh_interval_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            point_budget: 1000,
            tail_duration: 5.0,
            refresh_interval_ms: 100,
        }
    }
}

// =============================================================================
// ZoomDB Configuration
// =============================================================================

/// Complete ZoomDB configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ZoomConfig {
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub viewer: ViewerConfig,
}

impl ZoomConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| crate::ZoomError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> crate::Result<()> {
        if self.database.tree.fan_out < 2 {
            return Err(crate::ZoomError::Configuration(format!(
                "tree fan_out must be at least 2, got {}",
                self.database.tree.fan_out
            )));
        }
        if self.ingest.drain_interval_ms == 0 {
            return Err(crate::ZoomError::Configuration(
                "ingest drain_interval_ms must be positive".to_string(),
            ));
        }
        if self.ingest.queue_capacity == Some(0) {
            return Err(crate::ZoomError::Configuration(
                "ingest queue_capacity must be positive when set".to_string(),
            ));
        }
        if self.ingest.change_buffer == 0 {
            return Err(crate::ZoomError::Configuration(
                "ingest change_buffer must be positive".to_string(),
            ));
        }
        if !(self.viewer.tail_duration.is_finite() && self.viewer.tail_duration > 0.0) {
            return Err(crate::ZoomError::Configuration(format!(
                "viewer tail_duration must be a positive number of seconds, got {}",
                self.viewer.tail_duration
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
