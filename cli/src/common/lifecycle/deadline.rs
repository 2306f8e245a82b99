//! # Harness Deadline Source (`common::lifecycle::deadline`)
//!
//! File: cli/src/common/lifecycle/deadline.rs
//!
//! ## Overview
//!
//! Resolves the single outer deadline for a whole test run. An explicitly known
//! deadline always wins; otherwise the run gets `now + DEFAULT_TEST_TIMEOUT`.
//!
//! The explicit deadline usually comes from the environment
//! (`HARNESS_DEADLINE_SECS`, seconds from now) so CI can shrink or stretch a run
//! without touching configuration files.
//!
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Budget for a whole run when no explicit deadline is known.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Environment variable holding an explicit run deadline, in seconds from now.
pub const DEADLINE_ENV: &str = "HARNESS_DEADLINE_SECS";

/// Returns `explicit` if known, else `now + DEFAULT_TEST_TIMEOUT`.
pub fn resolve(explicit: Option<Instant>) -> Instant {
    resolve_with_default(explicit, DEFAULT_TEST_TIMEOUT)
}

/// Same as [`resolve`] but with a caller-supplied fallback budget
/// (e.g. `lifecycle.run_timeout_secs` from `harness.toml`).
pub fn resolve_with_default(explicit: Option<Instant>, fallback: Duration) -> Instant {
    match explicit {
        Some(deadline) => {
            debug!("Using explicit run deadline.");
            deadline
        }
        None => {
            debug!("No explicit run deadline, using {:?} from now.", fallback);
            after(Instant::now(), fallback)
        }
    }
}

/// Reads the explicit deadline from `HARNESS_DEADLINE_SECS`, if set and valid.
pub fn from_env() -> Option<Instant> {
    let raw = std::env::var(DEADLINE_ENV).ok()?;
    match parse_secs(&raw) {
        Some(budget) => Some(after(Instant::now(), budget)),
        None => {
            warn!(
                "Ignoring {}='{}': expected a whole number of seconds.",
                DEADLINE_ENV, raw
            );
            None
        }
    }
}

/// `start + budget`, saturating far in the future instead of overflowing.
pub(crate) fn after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .unwrap_or_else(|| start + Duration::from_secs(60 * 60 * 24 * 365))
}

fn parse_secs(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_deadline_wins() {
        let explicit = Instant::now() + Duration::from_secs(7);
        assert_eq!(resolve(Some(explicit)), explicit);
    }

    #[test]
    fn test_default_deadline_is_five_minutes_out() {
        let before = Instant::now();
        let resolved = resolve(None);
        let after_call = Instant::now();
        assert!(resolved >= before + DEFAULT_TEST_TIMEOUT);
        assert!(resolved <= after_call + DEFAULT_TEST_TIMEOUT);
    }

    #[test]
    fn test_custom_fallback() {
        let before = Instant::now();
        let resolved = resolve_with_default(None, Duration::from_secs(30));
        assert!(resolved >= before + Duration::from_secs(30));
        assert!(resolved < before + Duration::from_secs(31));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_secs(" 5\n"), Some(Duration::from_secs(5)));
        assert_eq!(parse_secs("soon"), None);
        assert_eq!(parse_secs("-3"), None);
    }

    #[test]
    fn test_after_saturates() {
        let now = Instant::now();
        let far = after(now, Duration::MAX);
        assert!(far > now);
    }
}
