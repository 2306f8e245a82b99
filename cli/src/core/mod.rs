//! # Harness Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the infrastructure shared by everything else in the
//! harness:
//! - `config`: Loading, expanding and validating `harness.toml`
//! - `error`: `HarnessError` and the crate-wide `Result` alias
//! - `templating`: Dockerfile rendering from configured templates
//!
//! ## Usage
//!
//! ```rust
//! use harness::core::config; // For loading configuration
//! use harness::core::error::{HarnessError, Result}; // For error handling
//! use harness::core::templating::Templates; // For Dockerfile rendering
//! ```
//!
pub mod config;
pub mod error;
pub mod templating;
