//! ZoomDB Error - Unified Error Types
//!
//! Error handling for all ZoomDB operations. Every error is local to the call
//! that produced it; a failed mutation never leaves a series half-updated.
//!
//! Key Features:
//! - Range and ordering violations raised by the storage core
//! - Configuration and IO errors raised while loading settings
//! - User vs system error classification
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all ZoomDB operations.
#[derive(Error, Debug)]
pub enum ZoomError {
    // Query errors
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidRange { start: f64, end: f64 },

    // Ingestion errors
    #[error("out of order sample: timestamp {timestamp} is before last timestamp {last}")]
    OutOfOrderSample { timestamp: f64, last: f64 },

    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("ingest queue closed")]
    QueueClosed,

    #[error("ingest queue full")]
    QueueFull,

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for ZoomDB operations.
pub type Result<T> = std::result::Result<T, ZoomError>;

// =============================================================================
// Error Classification
// =============================================================================

impl ZoomError {
    /// Returns true if this error was caused by the caller's input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ZoomError::InvalidRange { .. }
                | ZoomError::OutOfOrderSample { .. }
                | ZoomError::InvalidSample(_)
                | ZoomError::Configuration(_)
        )
    }

    /// Returns true if the operation can be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ZoomError::QueueFull)
    }

    /// Returns true if the error signals a rejected sample batch.
    pub fn is_rejected_sample(&self) -> bool {
        matches!(
            self,
            ZoomError::OutOfOrderSample { .. } | ZoomError::InvalidSample(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
