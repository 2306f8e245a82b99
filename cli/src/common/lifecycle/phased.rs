//! # Harness Phased Lifecycle Context (`common::lifecycle::phased`)
//!
//! File: cli/src/common/lifecycle/phased.rs
//!
//! ## Overview
//!
//! `PhasedContext` derives two dependent scopes from one root scope:
//!
//! - **starting**: bounds every setup call. Deadline `min(root, now + starting_budget)`
//!   computed on first access.
//! - **terminating**: bounds every teardown call. On first access it force-cancels
//!   the starting scope (materializing it first if nobody had), then gets deadline
//!   `min(root, now + terminating_budget)`.
//!
//! Both are memoized with `OnceLock`: concurrent first callers block briefly while
//! exactly one of them computes the scope, and every later call returns the same
//! scope with no further side effects.
//!
//! ## State Machine
//!
//! ```text
//! Idle --starting()--> Starting --terminating()--> Terminating
//!   \___________________ cancel() / drop ______________________--> Done
//! ```
//!
//! Teardown is never starved by a setup phase that used its whole budget: once
//! `terminating()` is called the starting scope is closed and teardown runs on a
//! fresh budget of its own.
//!
use super::deadline;
use super::scope::{Phase, Scope};
use crate::core::config::LifecycleConfig;
use crate::core::error::Result;
use anyhow::Context;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Logical state of a [`PhasedContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Only the root scope exists.
    Idle,
    /// The starting scope has been materialized.
    Starting,
    /// The starting scope was force-cancelled and the terminating scope materialized.
    Terminating,
    /// The root scope was cancelled by its owner (or its deadline elapsed).
    Done,
}

/// Startup/shutdown deadline coordinator for one test run.
#[derive(Debug)]
pub struct PhasedContext {
    root: Scope,
    starting_budget: Duration,
    terminating_budget: Duration,
    starting: OnceLock<Scope>,
    terminating: OnceLock<Scope>,
}

impl PhasedContext {
    /// Creates a context whose root scope ends at `root_deadline`.
    pub fn new(root_deadline: Instant, starting_budget: Duration, terminating_budget: Duration) -> Self {
        Self::from_root(
            Scope::new(Phase::Root, root_deadline),
            starting_budget,
            terminating_budget,
        )
    }

    /// Creates a context around an existing root scope (e.g. one tied to a parent token).
    pub fn from_root(root: Scope, starting_budget: Duration, terminating_budget: Duration) -> Self {
        debug!(
            "Created phased context: starting budget {:?}, terminating budget {:?}, {:?} until root deadline.",
            starting_budget,
            terminating_budget,
            root.remaining()
        );
        Self {
            root,
            starting_budget,
            terminating_budget,
            starting: OnceLock::new(),
            terminating: OnceLock::new(),
        }
    }

    /// Builds a context from `[lifecycle]` configuration. The root deadline comes from
    /// `HARNESS_DEADLINE_SECS` when set, else `run_timeout_secs` from now.
    pub fn from_config(cfg: &LifecycleConfig) -> Self {
        Self::from_config_with_deadline(cfg, deadline::from_env())
    }

    /// Like `from_config`, with the explicit root deadline given by the caller
    /// instead of read from the environment.
    pub fn from_config_with_deadline(cfg: &LifecycleConfig, explicit: Option<Instant>) -> Self {
        let root_deadline =
            deadline::resolve_with_default(explicit, Duration::from_secs(cfg.run_timeout_secs));
        Self::new(
            root_deadline,
            Duration::from_secs(cfg.starting_secs),
            Duration::from_secs(cfg.terminating_secs),
        )
    }

    /// The root scope. Its deadline never changes after construction.
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// The scope for all setup calls, computed on first access.
    pub fn starting(&self) -> &Scope {
        self.starting.get_or_init(|| {
            info!("Entering starting phase.");
            self.root.child(Phase::Starting, self.starting_budget)
        })
    }

    /// The scope for all teardown calls, computed on first access.
    ///
    /// The first call cancels the starting scope before deriving the new one,
    /// even if the starting scope was never used or still had time left.
    pub fn terminating(&self) -> &Scope {
        self.terminating.get_or_init(|| {
            info!("Entering terminating phase, closing starting scope.");
            self.starting().cancel();
            self.root.child(Phase::Terminating, self.terminating_budget)
        })
    }

    pub fn state(&self) -> LifecycleState {
        if self.root.is_cancelled() {
            LifecycleState::Done
        } else if self.terminating.get().is_some() {
            LifecycleState::Terminating
        } else if self.starting.get().is_some() {
            LifecycleState::Starting
        } else {
            LifecycleState::Idle
        }
    }

    /// Cancels the root scope and with it every derived scope.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Spawns a task that cancels the root scope on Ctrl-C.
    ///
    /// The task exits on its own once the root scope ends.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if called outside a Tokio runtime.
    pub fn cancel_on_interrupt(&self) -> Result<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("Interrupt handling requires a running Tokio runtime")?;
        let root = self.root.clone();
        Ok(runtime.spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => warn!("Interrupt received, cancelling run."),
                        Err(e) => warn!("Failed to listen for interrupt ({}), cancelling run.", e),
                    }
                    root.cancel();
                }
                _ = root.cancelled() => {}
            }
        }))
    }
}

impl Drop for PhasedContext {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
