//! Error types for rangelock.
//!
//! The blocking acquisition paths never fail: they either return a handle or
//! block until they can (see the crate docs for the liveness caveat). The
//! error type exists for the fallible edges of the API, which is currently
//! interval and configuration validation.
//!
//! # Example
//!
//! ```rust
//! use rangelock::{Interval, RangeLockError};
//!
//! let err = Interval::new(10, 5).unwrap_err();
//! assert!(matches!(err, RangeLockError::InvalidInterval { .. }));
//! ```

use thiserror::Error;

/// Main error type for rangelock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeLockError {
    #[error("Invalid interval: begin {begin} exceeds end {end}")]
    InvalidInterval { begin: u64, end: u64 },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

/// Result type alias for rangelock operations.
pub type Result<T> = std::result::Result<T, RangeLockError>;
