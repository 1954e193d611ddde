//! Bounded polling
//!
//! Every locate and check in the runner goes through [`poll_until`]: the
//! attempt is repeated until it reports [`Attempt::Ready`] or the timeout
//! elapses, in which case the last observation becomes the error.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};

/// Timeout and interval for retrying a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            interval: Duration::from_millis(50),
        }
    }
}

impl From<&Timeouts> for PollPolicy {
    fn from(timeouts: &Timeouts) -> Self {
        Self {
            timeout: timeouts.poll_timeout(),
            interval: timeouts.poll_interval(),
        }
    }
}

impl PollPolicy {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Outcome of one attempt
#[derive(Debug)]
pub enum Attempt<T> {
    /// Condition holds
    Ready(T),
    /// Not yet; the error describes what was observed
    Retry(Error),
}

impl<T> Attempt<T> {
    /// Retry on transient errors, give up on anything else
    pub fn from_result(result: Result<T>) -> Result<Self> {
        match result {
            Ok(value) => Ok(Attempt::Ready(value)),
            Err(e) if e.is_transient() => Ok(Attempt::Retry(e)),
            Err(e) => Err(e),
        }
    }
}

/// Repeat `attempt` until it is ready or `policy.timeout` elapses
///
/// The attempt always runs at least once. A hard error (`Err`) stops
/// polling immediately; on timeout the last `Retry` error is returned.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut tries = 0u32;
    loop {
        tries += 1;
        match attempt().await? {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Retry(err) => {
                if Instant::now() >= deadline {
                    tracing::debug!("Gave up after {} attempts: {}", tries, err);
                    return Err(err);
                }
            }
        }
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_millis(200),
            interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_ready_after_retries() {
        let calls = Cell::new(0);
        let value = poll_until(&quick(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Ok(Attempt::Retry(Error::not_found("#x", 0)))
                } else {
                    Ok(Attempt::Ready(n))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_last_observation() {
        let started = Instant::now();
        let err = poll_until::<(), _, _>(&quick(), || async {
            Ok(Attempt::Retry(Error::assertion_failed("#task-count", "'0'", "'2'")))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AssertionFailed { .. }));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_hard_error_stops_immediately() {
        let calls = Cell::new(0);
        let err = poll_until::<(), _, _>(&quick(), || {
            calls.set(calls.get() + 1);
            async { Err(Error::Navigation("closed".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_from_result_classifies() {
        assert!(matches!(
            Attempt::from_result(Ok(1)).unwrap(),
            Attempt::Ready(1)
        ));
        assert!(matches!(
            Attempt::<()>::from_result(Err(Error::StaleElement("h".into()))).unwrap(),
            Attempt::Retry(_)
        ));
        assert!(Attempt::<()>::from_result(Err(Error::Internal("x".into()))).is_err());
    }

    #[test]
    fn test_policy_from_timeouts() {
        let policy = PollPolicy::from(&Timeouts::default());
        assert_eq!(policy, PollPolicy::default());
        assert_eq!(policy.timeout_ms(), 4000);
    }
}
