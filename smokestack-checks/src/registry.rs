//! Check registry: ordered registration and sequential execution of
//! contract checks.
//!
//! Checks run one at a time in registration order, each under its own
//! timeout. A suite either aborts on the first failure (boot gate) or runs
//! to completion and aggregates (small and release suites).

use async_trait::async_trait;
use smokestack_core::config::HarnessConfig;
use smokestack_core::error::CheckError;
use smokestack_core::probe::Probe;
use smokestack_core::report::CheckOutcome;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared state every check executes against.
pub struct CheckContext {
    pub config: HarnessConfig,
    pub probe: Probe,
}

impl CheckContext {
    pub fn new(config: HarnessConfig, probe: Probe) -> Self {
        Self { config, probe }
    }
}

/// Trait that all contract checks implement.
///
/// A check is read-only by contract: it may GET, or POST a read-only search
/// body, but never mutate the stack under test.
#[async_trait]
pub trait Check: Send + Sync {
    /// The unique name of this check.
    fn name(&self) -> &str;

    /// Human-readable description of the contract being checked.
    fn description(&self) -> &str;

    /// Execute the check. Returns a success detail line, or the failure.
    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError>;

    /// Maximum execution time before the check is failed as timed out.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// Partial-failure policy of a suite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop at the first failing check (boot gate).
    AbortOnFailure,
    /// Run every check and aggregate (small and release suites).
    RunToCompletion,
}

/// Ordered collection of checks forming a suite.
pub struct CheckRegistry {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Append a check; execution order is registration order.
    pub fn register(&mut self, check: Arc<dyn Check>) {
        debug!(check = check.name(), "registered check");
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Names of the registered checks, in execution order.
    pub fn names(&self) -> Vec<String> {
        self.checks.iter().map(|c| c.name().to_string()).collect()
    }

    /// Execute all checks sequentially.
    ///
    /// `on_complete` is invoked as each check finishes, so callers can print
    /// a PASS/FAIL line while the suite is still running.
    pub async fn run(
        &self,
        ctx: &CheckContext,
        mode: FailureMode,
        mut on_complete: impl FnMut(&CheckOutcome),
    ) -> Vec<CheckOutcome> {
        let mut outcomes = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            let started = Instant::now();
            let result = tokio::time::timeout(check.timeout(), check.execute(ctx)).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(Ok(detail)) => CheckOutcome::passed(check.name(), detail, duration_ms),
                Ok(Err(e)) => CheckOutcome::failed(check.name(), e.to_string(), duration_ms),
                Err(_elapsed) => {
                    let e = CheckError::Timeout {
                        name: check.name().to_string(),
                        timeout_secs: check.timeout().as_secs(),
                    };
                    CheckOutcome::failed(check.name(), e.to_string(), duration_ms)
                }
            };

            info!(
                check = %outcome.name,
                status = %outcome.status,
                duration_ms = outcome.duration_ms,
                "check complete"
            );
            on_complete(&outcome);
            let failed = !outcome.is_passed();
            outcomes.push(outcome);

            if failed && mode == FailureMode::AbortOnFailure {
                break;
            }
        }

        outcomes
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smokestack_core::config::{HarnessConfig, HttpConfig};
    use smokestack_core::report::TestStatus;

    struct FixedCheck {
        name: &'static str,
        pass: bool,
    }

    #[async_trait]
    impl Check for FixedCheck {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fixed outcome for registry tests"
        }

        async fn execute(&self, _ctx: &CheckContext) -> Result<String, CheckError> {
            if self.pass {
                Ok("ok".into())
            } else {
                Err(CheckError::MissingField {
                    field: "choices".into(),
                })
            }
        }
    }

    struct SlowCheck;

    #[async_trait]
    impl Check for SlowCheck {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps past its own timeout"
        }

        async fn execute(&self, _ctx: &CheckContext) -> Result<String, CheckError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("never reached".into())
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
    }

    fn test_ctx() -> CheckContext {
        CheckContext::new(
            HarnessConfig::default(),
            Probe::new(&HttpConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_to_completion_aggregates() {
        let mut registry = CheckRegistry::new();
        registry.register(Arc::new(FixedCheck {
            name: "a",
            pass: true,
        }));
        registry.register(Arc::new(FixedCheck {
            name: "b",
            pass: false,
        }));
        registry.register(Arc::new(FixedCheck {
            name: "c",
            pass: true,
        }));

        let mut seen = Vec::new();
        let outcomes = registry
            .run(&test_ctx(), FailureMode::RunToCompletion, |o| {
                seen.push(o.name.clone())
            })
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(outcomes[1].status, TestStatus::Failed);
        assert_eq!(outcomes[2].status, TestStatus::Passed);
    }

    #[tokio::test]
    async fn test_abort_on_failure_stops_early() {
        let mut registry = CheckRegistry::new();
        registry.register(Arc::new(FixedCheck {
            name: "a",
            pass: true,
        }));
        registry.register(Arc::new(FixedCheck {
            name: "b",
            pass: false,
        }));
        registry.register(Arc::new(FixedCheck {
            name: "c",
            pass: true,
        }));

        let outcomes = registry
            .run(&test_ctx(), FailureMode::AbortOnFailure, |_| {})
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].name, "b");
        assert_eq!(outcomes[1].status, TestStatus::Failed);
    }

    #[tokio::test]
    async fn test_check_timeout_marks_failed() {
        let mut registry = CheckRegistry::new();
        registry.register(Arc::new(SlowCheck));

        let outcomes = registry
            .run(&test_ctx(), FailureMode::RunToCompletion, |_| {})
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, TestStatus::Failed);
        assert!(outcomes[0].detail.contains("timed out"));
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = CheckRegistry::new();
        registry.register(Arc::new(FixedCheck {
            name: "first",
            pass: true,
        }));
        registry.register(Arc::new(FixedCheck {
            name: "second",
            pass: true,
        }));
        assert_eq!(registry.names(), vec!["first".to_string(), "second".to_string()]);
    }
}
