//! Fixed-interval readiness polling for stack startup.
//!
//! The waiter polls a URL until the expected status code is observed or the
//! retry budget is exhausted. The interval is fixed, with no backoff, matching
//! the startup behavior of the stack's operational runbooks.

use crate::error::ProbeError;
use crate::probe::Probe;
use std::time::Duration;
use tracing::{debug, info};

/// One entry of a stack readiness plan.
#[derive(Debug, Clone)]
pub struct WaitPlan {
    /// Service name used in diagnostics.
    pub service: String,
    /// URL polled for readiness.
    pub url: String,
    /// HTTP status that marks the service ready.
    pub expected: u16,
}

impl WaitPlan {
    pub fn new(service: impl Into<String>, url: impl Into<String>, expected: u16) -> Self {
        Self {
            service: service.into(),
            url: url.into(),
            expected,
        }
    }
}

/// Poll `url` until it returns `expected`, up to `tries` polls spaced
/// `interval` apart.
///
/// Returns the number of polls used on success. Connection refusal and
/// unexpected status codes both count as a failed poll; after the budget is
/// exhausted the last observed outcome is carried in the error.
pub async fn wait_for_status(
    probe: &Probe,
    plan: &WaitPlan,
    tries: u32,
    interval: Duration,
) -> Result<u32, ProbeError> {
    let mut last = String::from("no poll executed");

    for attempt in 1..=tries {
        match probe.status(&plan.url).await {
            Ok(status) if status == plan.expected => {
                info!(
                    service = %plan.service,
                    attempt,
                    "service ready"
                );
                return Ok(attempt);
            }
            Ok(status) => {
                debug!(service = %plan.service, attempt, status, "not ready yet");
                last = format!("HTTP {status}");
            }
            Err(e) => {
                debug!(service = %plan.service, attempt, error = %e, "not reachable yet");
                last = e.to_string();
            }
        }
        tokio::time::sleep(interval).await;
    }

    Err(ProbeError::NotReady {
        service: plan.service.clone(),
        url: plan.url.clone(),
        tries,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use axum::{Router, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    async fn flaky_server(ready_after: u32) -> String {
        let polls = Arc::new(AtomicU32::new(0));
        let router = Router::new().route(
            "/",
            get(move || {
                let polls = polls.clone();
                async move {
                    let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n >= ready_after {
                        (axum::http::StatusCode::OK, "up")
                    } else {
                        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "starting")
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_wait_succeeds_once_ready() {
        let base = flaky_server(3).await;
        let probe = Probe::new(&HttpConfig::default()).unwrap();
        let plan = WaitPlan::new("flaky", format!("{base}/"), 200);

        let start = Instant::now();
        let used = wait_for_status(&probe, &plan, 20, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(used, 3);
        // Ready on the 3rd poll: the waiter must not have slept the full budget.
        assert!(start.elapsed() < Duration::from_millis(20 * 50));
    }

    #[tokio::test]
    async fn test_wait_fails_after_budget() {
        let probe = Probe::new(&HttpConfig::default()).unwrap();
        // Nothing listens here; every poll is a connection failure.
        let plan = WaitPlan::new("ghost", "http://127.0.0.1:9/", 200);

        let start = Instant::now();
        let err = wait_for_status(&probe, &plan, 4, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(4 * 50));
        match err {
            ProbeError::NotReady { service, tries, .. } => {
                assert_eq!(service, "ghost");
                assert_eq!(tries, 4);
            }
            e => panic!("expected NotReady, got: {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_reports_last_status() {
        let base = flaky_server(u32::MAX).await;
        let probe = Probe::new(&HttpConfig::default()).unwrap();
        let plan = WaitPlan::new("stuck", format!("{base}/"), 200);

        let err = wait_for_status(&probe, &plan, 2, Duration::from_millis(10))
            .await
            .unwrap_err();
        match err {
            ProbeError::NotReady { last, .. } => assert_eq!(last, "HTTP 503"),
            e => panic!("expected NotReady, got: {e:?}"),
        }
    }
}
