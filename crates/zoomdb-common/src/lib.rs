//! ZoomDB Common - Shared Types and Utilities
//!
//! Foundational error handling and configuration shared by every ZoomDB
//! crate: the level-of-detail storage core, the ingest pipeline, and the
//! command line driver.
//!
//! Key Features:
//! - Unified error type with user error classification
//! - Configuration structures for the tree, database, ingest and viewer
//! - TOML configuration loading with validation
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod config;
pub mod error;

pub use config::{DEFAULT_FAN_OUT, DatabaseConfig, IngestConfig, TreeConfig, ViewerConfig, ZoomConfig};
pub use error::{Result, ZoomError};
