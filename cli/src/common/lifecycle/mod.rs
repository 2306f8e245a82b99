//! # Harness Lifecycle Module (`common::lifecycle`)
//!
//! File: cli/src/common/lifecycle/mod.rs
//!
//! ## Overview
//!
//! Deadline and cancellation coordination for long-running fixtures (containers,
//! networks). A test run owns one root deadline; setup work and teardown work each
//! get their own budget carved out of it, and teardown is guaranteed to start only
//! after setup has been forcibly closed.
//!
//! ## Architecture
//!
//! - **`deadline`**: Resolves the single outer deadline for the whole run.
//! - **`scope`**: `Scope`, a cancellable, deadline-bound unit of work lifetime built
//!   on `tokio_util::sync::CancellationToken`.
//! - **`phased`**: `PhasedContext`, which lazily derives the `starting` and
//!   `terminating` scopes from the root scope, each at most once.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use harness::common::lifecycle::{deadline, PhasedContext};
//! use std::time::Duration;
//!
//! # async fn run() -> harness::core::error::Result<()> {
//! let ctx = PhasedContext::new(
//!     deadline::resolve(None),
//!     Duration::from_secs(120),
//!     Duration::from_secs(120),
//! );
//! // Every setup call is bounded by the starting scope...
//! ctx.starting().run(async { Ok(()) }).await?;
//! // ...and every teardown call by the terminating scope.
//! ctx.terminating().run(async { Ok(()) }).await?;
//! # Ok(())
//! # }
//! ```
//!

pub mod deadline;
pub mod phased;
pub mod scope;

pub use phased::{LifecycleState, PhasedContext};
pub use scope::{Phase, Scope};
