//! Stack lifecycle controller.
//!
//! Wraps `docker compose` to bring the stack up and down. Start validates
//! the compose config, launches detached, and polls every service until
//! ready. Stop snapshots service status for postmortems, stops with a
//! bounded grace period, tears down, and flushes filesystem buffers.
//! Stopping when nothing is running (or when the container runtime is
//! unreachable) is a successful no-op.

use chrono::Utc;
use smokestack_core::config::HarnessConfig;
use smokestack_core::error::LifecycleError;
use smokestack_core::probe::Probe;
use smokestack_core::wait::{WaitPlan, wait_for_status};
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use tracing::{info, warn};

/// Controller for the containerized stack.
pub struct StackController {
    config: HarnessConfig,
    probe: Probe,
}

impl StackController {
    pub fn new(config: HarnessConfig, probe: Probe) -> Self {
        Self { config, probe }
    }

    /// The services polled for readiness after start, in dependency order.
    pub fn readiness_plan(&self) -> Vec<WaitPlan> {
        let endpoints = &self.config.endpoints;
        vec![
            WaitPlan::new(
                "elasticsearch",
                format!("{}/", endpoints.elasticsearch),
                200,
            ),
            WaitPlan::new("llm", format!("{}/api/tags", endpoints.llm), 200),
            WaitPlan::new("agent", format!("{}/health", endpoints.agent), 200),
            WaitPlan::new("webui", format!("{}/", endpoints.webui), 200),
        ]
    }

    /// Validate the compose configuration without touching any container.
    pub async fn validate(&self) -> Result<(), LifecycleError> {
        let output = self.compose(&["config", "-q"]).await?;
        if !output.status.success() {
            return Err(LifecycleError::InvalidComposeConfig {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Validate, launch all services detached, and wait for readiness.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.validate().await?;

        let output = self.compose(&["up", "-d"]).await?;
        self.require_success("up -d", &output)?;
        info!("stack launched, waiting for readiness");

        let tries = self.config.readiness.tries;
        let interval = Duration::from_secs(self.config.readiness.interval_secs);
        for plan in self.readiness_plan() {
            let used = wait_for_status(&self.probe, &plan, tries, interval)
                .await
                .map_err(|e| LifecycleError::ServiceNotReady {
                    service: plan.service.clone(),
                    source: e,
                })?;
            info!(service = %plan.service, polls = used, "ready");
        }
        Ok(())
    }

    /// Snapshot service status, stop gracefully, tear down, flush buffers.
    ///
    /// An unreachable container runtime means there is nothing to stop; the
    /// operation succeeds without doing anything.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let ps = match self.compose(&["ps"]).await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                info!(
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "container runtime reports no running stack, nothing to stop"
                );
                return Ok(());
            }
            Err(e) => {
                info!(error = %e, "container runtime unreachable, nothing to stop");
                return Ok(());
            }
        };

        if let Err(e) = self.snapshot_status(&ps) {
            warn!(error = %e, "failed to snapshot service status, stopping anyway");
        }

        let grace = self.config.compose.stop_grace_secs.to_string();
        let output = self.compose(&["stop", "-t", &grace]).await?;
        if !output.status.success() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "graceful stop failed, proceeding to teardown"
            );
        }

        let output = self.compose(&["down", "--remove-orphans"]).await?;
        self.require_success("down --remove-orphans", &output)?;

        // Flush filesystem buffers so bind-mounted data survives a host
        // power-off right after teardown.
        if let Err(e) = tokio::process::Command::new("sync").status().await {
            warn!(error = %e, "sync failed");
        }

        info!("stack stopped");
        Ok(())
    }

    /// Write `compose ps` output to a timestamped snapshot directory.
    fn snapshot_status(&self, ps: &Output) -> Result<PathBuf, LifecycleError> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let dir = self
            .config
            .report
            .resolve_dir()
            .join("snapshots")
            .join(format!("stack-{stamp}"));
        std::fs::create_dir_all(&dir).map_err(|e| LifecycleError::SnapshotFailed {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        let path = dir.join("services.txt");
        std::fs::write(&path, &ps.stdout).map_err(|e| LifecycleError::SnapshotFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "service status snapshot written");
        Ok(path)
    }

    /// Run `<binary> compose <args..>` and collect its output.
    async fn compose(&self, args: &[&str]) -> Result<Output, LifecycleError> {
        let compose = &self.config.compose;
        let mut command = tokio::process::Command::new(&compose.binary);
        command.arg("compose");
        if let Some(file) = &compose.file {
            command.arg("-f").arg(file);
        }
        command.args(args);

        let rendered = format!("{} compose {}", compose.binary, args.join(" "));
        command
            .output()
            .await
            .map_err(|e| LifecycleError::SpawnFailed {
                command: rendered,
                message: e.to_string(),
            })
    }

    fn require_success(&self, action: &str, output: &Output) -> Result<(), LifecycleError> {
        if output.status.success() {
            return Ok(());
        }
        Err(LifecycleError::CommandFailed {
            command: format!("{} compose {action}", self.config.compose.binary),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
