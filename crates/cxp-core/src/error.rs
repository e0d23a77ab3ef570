//! Unified error type for model construction.
//!
//! Every failure that aborts building an expansion model is represented by
//! [`CxpError`]. Advisory problems (out-of-range but usable parameters) are
//! not errors; they are collected in [`crate::Diagnostics`] instead.
//!
//! # Example
//!
//! ```
//! use cxp_core::{CxpError, CxpResult};
//!
//! fn require_positive(value: f64) -> CxpResult<f64> {
//!     if value > 0.0 {
//!         Ok(value)
//!     } else {
//!         Err(CxpError::Config(format!("expected a positive value, got {value}")))
//!     }
//! }
//!
//! assert!(require_positive(-1.0).is_err());
//! ```

use thiserror::Error;

/// Error type for all model-construction operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CxpError {
    /// Invalid or inconsistent input data (duplicate lines, missing mandatory
    /// values, references to unknown zones or periods, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A balance term was registered after the registry was finalized, or a
    /// term id was registered twice
    #[error("Registration error: {0}")]
    Registration(String),

    /// A directional pair, asset or period could not be resolved
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Input requests behavior the model does not implement
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Solver failed to produce a solution
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using CxpError.
pub type CxpResult<T> = Result<T, CxpError>;

impl From<toml::de::Error> for CxpError {
    fn from(err: toml::de::Error) -> Self {
        CxpError::Parse(err.to_string())
    }
}
