//! Timeout-bounded polling over [`VnfmAdapter::get_operation_status`].

use crate::adapter::VnfmAdapter;
use crate::error::{LcmError, LcmResult};
use crate::handle::OperationHandle;
use crate::status::{OperationStatus, FINAL_STATES};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Delay between consecutive polls.
    pub poll_interval: Duration,
    /// Total time budget.
    pub max_wait: Duration,
    /// Statuses that end the wait.
    pub final_states: Vec<OperationStatus>,
}

impl WaitOptions {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
            final_states: FINAL_STATES.to_vec(),
        }
    }

    fn is_final(&self, status: OperationStatus) -> bool {
        self.final_states.contains(&status)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(600))
    }
}

/// Result of [`wait_for_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitOutcome {
    /// Last status observed at or before the deadline.
    pub status: OperationStatus,
    /// True if the budget ran out before a final status was seen.
    pub timed_out: bool,
    /// Number of status calls made.
    pub polls: u32,
    /// Time spent waiting.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl WaitOutcome {
    /// Returns true if the operation reached `SUCCESS` within the budget.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.status == OperationStatus::Success
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// Polls `adapter` until `handle` reaches a final status or the budget runs
/// out.
///
/// A timeout is not an error: the outcome carries the last observed status
/// with `timed_out` set. Transient backend errors are retried on the next
/// interval, but if the last poll before the deadline failed, that error is
/// returned. Any other error is returned immediately.
///
/// Each status call may run until one poll interval past the deadline; a
/// call that has not answered by then counts as a backend error, so the
/// wait never outlasts `max_wait + poll_interval`.
///
/// The function keeps no state beyond its own locals, so concurrent waits on
/// different handles (or the same handle) are independent.
pub async fn wait_for_completion(
    adapter: &dyn VnfmAdapter,
    handle: &OperationHandle,
    options: &WaitOptions,
) -> LcmResult<WaitOutcome> {
    let start = Instant::now();
    let mut polls = 0u32;
    let mut last = OperationStatus::Pending;

    loop {
        polls += 1;
        let call_budget = options.max_wait.saturating_sub(start.elapsed()) + options.poll_interval;
        let polled = tokio::time::timeout(call_budget, adapter.get_operation_status(handle))
            .await
            .unwrap_or_else(|_| {
                Err(LcmError::backend(
                    adapter.vendor().as_str(),
                    "get_operation_status",
                    format!("no answer within {:?}", call_budget),
                ))
            });
        let outstanding = match polled {
            Ok(status) => {
                last = status;
                tracing::debug!(handle = %handle, status = %status, polls, "Polled operation status");
                if options.is_final(status) {
                    let elapsed = start.elapsed();
                    tracing::info!(handle = %handle, status = %status, ?elapsed, "Operation reached final state");
                    return Ok(WaitOutcome {
                        status,
                        timed_out: false,
                        polls,
                        elapsed,
                    });
                }
                None
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(handle = %handle, error = %e, "Status poll failed, retrying");
                Some(e)
            }
            Err(e) => return Err(e),
        };

        let elapsed = start.elapsed();
        if elapsed >= options.max_wait {
            if let Some(e) = outstanding {
                tracing::error!(handle = %handle, error = %e, "Backend still failing at deadline");
                return Err(e);
            }
            tracing::warn!(handle = %handle, status = %last, ?elapsed, "Wait budget exhausted");
            return Ok(WaitOutcome {
                status: last,
                timed_out: true,
                polls,
                elapsed,
            });
        }

        let remaining = options.max_wait - elapsed;
        tokio::time::sleep(options.poll_interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{Correlation, OperationKind, Vendor};
    use crate::oplog::OperationLog;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed script of poll results, repeating the last one.
    struct ScriptedAdapter {
        log: OperationLog,
        script: Mutex<Vec<Result<OperationStatus, &'static str>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedAdapter {
        fn new(script: Vec<Result<OperationStatus, &'static str>>) -> Self {
            Self {
                log: OperationLog::new(),
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VnfmAdapter for ScriptedAdapter {
        fn vendor(&self) -> Vendor {
            Vendor::Tacker
        }

        fn operation_log(&self) -> &OperationLog {
            &self.log
        }

        async fn get_operation_status(&self, _handle: &OperationHandle) -> LcmResult<OperationStatus> {
            self.calls.lock().unwrap().push(Instant::now());
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0]
                }
            };
            match next {
                Ok(status) => Ok(status),
                Err("ambiguous") => Err(LcmError::ambiguous_state("vim", "weird")),
                Err("hang") => std::future::pending().await,
                Err(msg) => Err(LcmError::backend("vim", "probe_state", msg)),
            }
        }
    }

    fn handle() -> OperationHandle {
        OperationHandle::new(
            Vendor::Tacker,
            OperationKind::Instantiate,
            Correlation::Occurrence("occ-1".to_string()),
        )
    }

    fn opts(poll: u64, max: u64) -> WaitOptions {
        WaitOptions::new(Duration::from_secs(poll), Duration::from_secs(max))
    }

    use OperationStatus::*;

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_success() {
        let adapter = ScriptedAdapter::new(vec![Ok(Pending), Ok(Pending), Ok(Success)]);
        let outcome = wait_for_completion(&adapter, &handle(), &opts(5, 60))
            .await
            .unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.polls, 3);
        assert_eq!(outcome.elapsed, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_is_distinct_from_timeout() {
        let adapter = ScriptedAdapter::new(vec![Ok(Pending), Ok(Failed)]);
        let outcome = wait_for_completion(&adapter, &handle(), &opts(5, 60))
            .await
            .unwrap();
        assert_eq!(outcome.status, Failed);
        assert!(!outcome.timed_out);

        let adapter = ScriptedAdapter::new(vec![Ok(Pending)]);
        let outcome = wait_for_completion(&adapter, &handle(), &opts(5, 12))
            .await
            .unwrap();
        assert_eq!(outcome.status, Pending);
        assert!(outcome.timed_out);
        assert!(!outcome.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bound() {
        // interval does not divide the budget: last sleep is clipped
        let adapter = ScriptedAdapter::new(vec![Ok(Pending)]);
        let start = Instant::now();
        let outcome = wait_for_completion(&adapter, &handle(), &opts(7, 20))
            .await
            .unwrap();
        let waited = start.elapsed();
        assert!(outcome.timed_out);
        assert!(waited <= Duration::from_secs(20 + 7));
        assert_eq!(waited, Duration::from_secs(20));

        let calls = adapter.calls.lock().unwrap();
        let offsets: Vec<u64> = calls.iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![0, 7, 14, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_backend_error_retried() {
        let adapter = ScriptedAdapter::new(vec![Err("reset"), Ok(Pending), Ok(Success)]);
        let outcome = wait_for_completion(&adapter, &handle(), &opts(1, 30))
            .await
            .unwrap();
        assert_eq!(outcome.status, Success);
        assert_eq!(outcome.polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_backend_error_propagates() {
        let adapter = ScriptedAdapter::new(vec![Ok(Pending), Err("unreachable")]);
        let err = wait_for_completion(&adapter, &handle(), &opts(2, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, LcmError::Backend { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_propagates_immediately() {
        let adapter = ScriptedAdapter::new(vec![Ok(Pending), Err("ambiguous"), Ok(Success)]);
        let err = wait_for_completion(&adapter, &handle(), &opts(2, 60))
            .await
            .unwrap_err();
        assert!(matches!(err, LcmError::AmbiguousState { .. }));
        assert_eq!(adapter.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_status_call_is_bounded() {
        // polls at 0, 5 and 10; the third never answers
        let adapter = ScriptedAdapter::new(vec![Ok(Pending), Ok(Pending), Err("hang")]);
        let start = Instant::now();
        let err = wait_for_completion(&adapter, &handle(), &opts(5, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, LcmError::Backend { .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(20 + 5));
        assert_eq!(adapter.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_first_call_is_bounded() {
        let adapter = ScriptedAdapter::new(vec![Err("hang")]);
        let start = Instant::now();
        let err = wait_for_completion(&adapter, &handle(), &opts(3, 9))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(start.elapsed(), Duration::from_secs(9 + 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_final_states() {
        let adapter = ScriptedAdapter::new(vec![Ok(Failed), Ok(Success)]);
        let mut options = opts(1, 10);
        options.final_states = vec![Success];
        let outcome = wait_for_completion(&adapter, &handle(), &options).await.unwrap();
        assert_eq!(outcome.status, Success);
        assert_eq!(outcome.polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_polls_once() {
        let adapter = ScriptedAdapter::new(vec![Ok(Pending)]);
        let outcome = wait_for_completion(&adapter, &handle(), &opts(5, 0))
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.polls, 1);
    }
}
