//! # Harness Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types shared by every part of the harness: the
//! archive engine, the phased lifecycle context, the Docker fixtures and the CLI.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `HarnessError`: A custom error enum using `thiserror` for the failures callers
//!   may want to match on (deadline vs. cancellation, encoding vs. I/O, ...).
//! - `Result<T>`: A type alias for `anyhow::Result<T>` so call sites can attach
//!   context while propagating with `?`.
//!
//! Every fatal error travels back to the enclosing test or command as an `Err`.
//! There is no partial-success mode: an archive that failed half way is invalid as
//! a whole, and the caller is expected to abort.
//!
//! ## Examples
//!
//! ```rust
//! use harness::core::error::{HarnessError, Result};
//! use harness::common::lifecycle::Phase;
//!
//! fn check(result: Result<()>) -> bool {
//!     // Was the failure caused by a phase running out of time?
//!     matches!(
//!         result.as_ref().err().and_then(|e| e.downcast_ref::<HarnessError>()),
//!         Some(HarnessError::DeadlineExceeded { phase: Phase::Starting })
//!     )
//! }
//! ```
//!
use crate::common::lifecycle::Phase;
use thiserror::Error;

/// Custom error type for the harness.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A member header could not be represented in the target format.
    #[error("Archive encoding error: {0}")]
    Encoding(String),

    #[error("Zip archive error: {source}")]
    Zip {
        #[from]
        source: zip::result::ZipError,
    },

    /// The background archive producer failed after its caller had returned.
    #[error("Archive producer failed: {0}")]
    Producer(String),

    #[error("The {phase} scope was cancelled")]
    Cancelled { phase: Phase },

    #[error("The {phase} scope exceeded its deadline")]
    DeadlineExceeded { phase: Phase },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },

    #[error("Docker API interaction failed: {source}")]
    DockerApi {
        #[from]
        source: bollard::errors::Error,
    },

    #[error("Docker operation failed: {0}")]
    Docker(String),
}

impl HarnessError {
    /// True for the two ways a scope can end: cancellation or an elapsed deadline.
    pub fn is_scope_end(&self) -> bool {
        matches!(
            self,
            HarnessError::Cancelled { .. } | HarnessError::DeadlineExceeded { .. }
        )
    }
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
