//! # Harness Scopes (`common::lifecycle::scope`)
//!
//! File: cli/src/common/lifecycle/scope.rs
//!
//! ## Overview
//!
//! A `Scope` is a cancellable, deadline-bound unit of work lifetime. It pairs a
//! `CancellationToken` with an absolute `tokio::time::Instant` deadline. A scope is
//! "done" once its token is cancelled (explicitly or through a parent) or its
//! deadline has elapsed, whichever happens first.
//!
//! Child scopes get `min(parent deadline, now + budget)` and a child token, so
//! cancelling a parent ends every descendant transitively while a child can be
//! cancelled on its own without touching the parent.
//!
//! External calls are bounded with [`Scope::run`], which races the call against
//! the scope's end.
//!
use super::deadline;
use crate::core::error::{HarnessError, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which part of the run a scope bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The whole run.
    Root,
    /// Resource setup: network/container creation, readiness waits.
    Starting,
    /// Resource teardown: container stop/remove, network removal.
    Terminating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Root => "root",
            Phase::Starting => "starting",
            Phase::Terminating => "terminating",
        };
        f.write_str(name)
    }
}

/// A cancellable, deadline-bound unit of work lifetime.
///
/// Cloning a scope yields a handle to the same scope (same token, same deadline).
#[derive(Debug, Clone)]
pub struct Scope {
    phase: Phase,
    token: CancellationToken,
    deadline: Instant,
}

impl Scope {
    /// Creates a fresh top-level scope ending at `deadline`.
    pub fn new(phase: Phase, deadline: Instant) -> Self {
        Self {
            phase,
            token: CancellationToken::new(),
            deadline,
        }
    }

    /// Creates a top-level scope that is also cancelled whenever `parent` is.
    pub fn with_parent(phase: Phase, parent: &CancellationToken, deadline: Instant) -> Self {
        Self {
            phase,
            token: parent.child_token(),
            deadline,
        }
    }

    /// Derives a child scope with deadline `min(self.deadline, now + budget)`.
    pub fn child(&self, phase: Phase, budget: Duration) -> Scope {
        let deadline = self.deadline.min(deadline::after(Instant::now(), budget));
        debug!(
            parent = %self.phase,
            child = %phase,
            "Derived child scope with {:?} remaining.",
            deadline.saturating_duration_since(Instant::now())
        );
        Scope {
            phase,
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The absolute deadline, fixed at construction.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline (zero once elapsed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// A token cancelled together with this scope, for work that should outlive a
    /// single call but not the scope itself (e.g. log followers).
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Cancels this scope and every scope derived from it.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(phase = %self.phase, "Cancelling scope.");
        }
        self.token.cancel();
    }

    /// True once the scope was cancelled or its deadline elapsed.
    pub fn is_cancelled(&self) -> bool {
        self.error().is_some()
    }

    /// Why the scope ended, or `None` while it is still live.
    /// Explicit cancellation is reported in preference to an elapsed deadline.
    pub fn error(&self) -> Option<HarnessError> {
        if self.token.is_cancelled() {
            Some(HarnessError::Cancelled { phase: self.phase })
        } else if Instant::now() >= self.deadline {
            Some(HarnessError::DeadlineExceeded { phase: self.phase })
        } else {
            None
        }
    }

    /// `Ok(())` while the scope is live, its end condition otherwise.
    pub fn check(&self) -> Result<()> {
        match self.error() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Resolves once the scope is cancelled or its deadline elapses.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = sleep_until(self.deadline) => {}
        }
    }

    /// Runs `fut` bounded by this scope.
    ///
    /// # Errors
    ///
    /// * `HarnessError::Cancelled` - The scope was (or becomes) cancelled first.
    /// * `HarnessError::DeadlineExceeded` - The deadline elapsed first.
    /// * Whatever `fut` itself returns.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(HarnessError::Cancelled { phase: self.phase }.into()),
            _ = sleep_until(self.deadline) => {
                Err(HarnessError::DeadlineExceeded { phase: self.phase }.into())
            }
            out = fut => out,
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn in_secs(secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(secs)
    }

    fn scope_error(result: Result<()>) -> HarnessError {
        result
            .expect_err("scope should have ended")
            .downcast::<HarnessError>()
            .expect("error should be a HarnessError")
    }

    #[test]
    fn test_child_deadline_is_clamped_to_parent() {
        let parent = Scope::new(Phase::Root, in_secs(5));
        let child = parent.child(Phase::Starting, Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let short = parent.child(Phase::Starting, Duration::from_secs(1));
        assert!(short.deadline() < parent.deadline());
    }

    #[test]
    fn test_parent_cancel_propagates_but_child_cancel_does_not() {
        let parent = Scope::new(Phase::Root, in_secs(60));
        let a = parent.child(Phase::Starting, Duration::from_secs(10));
        let b = parent.child(Phase::Terminating, Duration::from_secs(10));

        a.cancel();
        assert!(a.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!b.is_cancelled());

        parent.cancel();
        assert!(b.is_cancelled());
        assert!(matches!(
            b.error(),
            Some(HarnessError::Cancelled {
                phase: Phase::Terminating
            })
        ));
    }

    #[test]
    fn test_elapsed_deadline_reports_deadline_exceeded() {
        let scope = Scope::new(Phase::Starting, Instant::now());
        assert!(scope.is_cancelled());
        assert!(matches!(
            scope_error(scope.check()),
            HarnessError::DeadlineExceeded {
                phase: Phase::Starting
            }
        ));
        assert_eq!(scope.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_run_completes_within_scope() -> Result<()> {
        let scope = Scope::new(Phase::Starting, in_secs(10));
        let value = scope.run(async { Ok(42) }).await?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_is_bounded_by_deadline() {
        let scope = Scope::new(Phase::Starting, Instant::now() + Duration::from_millis(50));
        let result = scope
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            scope_error(result),
            HarnessError::DeadlineExceeded { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_is_interrupted_by_cancel() {
        let scope = Scope::new(Phase::Terminating, in_secs(30));
        let canceller = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let result = scope.run(std::future::pending::<Result<()>>()).await;
        assert!(matches!(
            scope_error(result),
            HarnessError::Cancelled {
                phase: Phase::Terminating
            }
        ));
    }

    #[tokio::test]
    async fn test_run_refuses_to_start_on_ended_scope() {
        let scope = Scope::new(Phase::Root, in_secs(30));
        scope.cancel();
        let result = scope.run(async { Ok(()) }).await;
        assert!(matches!(scope_error(result), HarnessError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_deadline() {
        let scope = Scope::new(Phase::Root, Instant::now() + Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(5), scope.cancelled())
            .await
            .expect("deadline should end the scope");
    }
}
