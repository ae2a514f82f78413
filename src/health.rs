// ABOUTME: Generic bounded-retry polling primitive.
// ABOUTME: Drives container readiness, port reachability, and proxy validation checks.

use std::future::Future;
use std::time::Duration;

/// Numeric policy for one polling site.
///
/// Every call site supplies its own policy explicitly; the poller has no
/// hidden defaults, which keeps it testable with small values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl HealthCheckPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// What one check attempt observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The condition holds; stop polling.
    Ready,
    /// Not there yet; retry after the interval.
    StillPending,
    /// A condition that will never self-resolve by waiting longer
    /// (e.g. the container has exited). Stops polling immediately.
    TerminalFailure(String),
}

/// Terminal result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    TimedOut,
    TerminalFailure(String),
}

/// Invoke `check` up to `policy.max_attempts` times.
///
/// `StillPending` consumes one attempt and sleeps `policy.interval`, except
/// after the final attempt, which returns `TimedOut` without sleeping.
/// `TerminalFailure` short-circuits regardless of remaining attempts.
pub async fn poll<F, Fut>(policy: HealthCheckPolicy, mut check: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CheckOutcome>,
{
    for attempt in 1..=policy.max_attempts {
        match check().await {
            CheckOutcome::Ready => return PollOutcome::Ready,
            CheckOutcome::TerminalFailure(detail) => {
                return PollOutcome::TerminalFailure(detail);
            }
            CheckOutcome::StillPending => {
                tracing::debug!(attempt, max = policy.max_attempts, "check still pending");
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    PollOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Forever-pending checks time out after exactly max_attempts invocations
    /// and sleep exactly max_attempts - 1 times.
    #[tokio::test(start_paused = true)]
    async fn times_out_after_exact_attempt_budget() {
        let calls = Cell::new(0u32);
        let policy = HealthCheckPolicy::new(5, Duration::from_secs(3));

        let started = tokio::time::Instant::now();
        let outcome = poll(policy, || {
            calls.set(calls.get() + 1);
            async { CheckOutcome::StillPending }
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(calls.get(), 5);
        // 4 sleeps of 3s on the paused clock; no sleep after the last attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    /// A terminal failure short-circuits before the attempt budget runs out.
    #[tokio::test(start_paused = true)]
    async fn terminal_failure_short_circuits() {
        let calls = Cell::new(0u32);
        let policy = HealthCheckPolicy::new(12, Duration::from_secs(3));

        let outcome = poll(policy, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n >= 2 {
                    CheckOutcome::TerminalFailure("container exited".to_string())
                } else {
                    CheckOutcome::StillPending
                }
            }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::TerminalFailure("container exited".to_string())
        );
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn ready_on_first_attempt_does_not_sleep() {
        let policy = HealthCheckPolicy::new(3, Duration::from_secs(3600));

        // Would hang for an hour if it slept; real clock keeps this honest.
        let outcome = poll(policy, || async { CheckOutcome::Ready }).await;

        assert_eq!(outcome, PollOutcome::Ready);
    }

    #[tokio::test]
    async fn ready_after_pending_attempts() {
        let calls = Cell::new(0u32);
        let policy = HealthCheckPolicy::new(4, Duration::from_millis(1));

        let outcome = poll(policy, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n == 3 {
                    CheckOutcome::Ready
                } else {
                    CheckOutcome::StillPending
                }
            }
        })
        .await;

        assert_eq!(outcome, PollOutcome::Ready);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn zero_attempts_times_out_without_invoking() {
        let calls = Cell::new(0u32);
        let policy = HealthCheckPolicy::new(0, Duration::from_secs(1));

        let outcome = poll(policy, || {
            calls.set(calls.get() + 1);
            async { CheckOutcome::Ready }
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(calls.get(), 0);
    }
}
