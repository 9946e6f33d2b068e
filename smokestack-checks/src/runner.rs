//! External-script test runner.
//!
//! Discovers numbered test scripts (`NN_name`) in a directory, runs each as
//! an independent process under a hard wall-clock timeout, and folds the
//! per-script outcomes into an aggregate summary. A hung script is killed
//! and marked failed so one wedged network call cannot stall the run.

use smokestack_core::config::RunnerConfig;
use smokestack_core::error::RunnerError;
use smokestack_core::report::{RunReport, TestRecord, TestStatus};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, warn};

/// A discovered test script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScript {
    /// Script file name (`01_es_health.sh`).
    pub name: String,
    pub path: PathBuf,
}

/// True for file names with a two-digit numeric prefix and underscore.
fn is_numbered_script(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'_'
}

/// Discover `NN_name` test scripts in `dir`, in lexical order.
pub fn discover_scripts(dir: &Path) -> Result<Vec<TestScript>, RunnerError> {
    if !dir.is_dir() {
        return Err(RunnerError::DirNotFound {
            dir: dir.to_path_buf(),
        });
    }

    let mut scripts: Vec<TestScript> = std::fs::read_dir(dir)
        .map_err(|e| RunnerError::DirNotFound {
            dir: PathBuf::from(format!("{} ({e})", dir.display())),
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            is_numbered_script(&name).then(|| TestScript {
                name,
                path: entry.path(),
            })
        })
        .collect();

    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    if scripts.is_empty() {
        return Err(RunnerError::NoScripts {
            dir: dir.to_path_buf(),
        });
    }
    Ok(scripts)
}

/// Run one test script as its own process with a hard timeout.
///
/// Exit 0 is a pass; any other exit, a spawn failure, or timeout expiry is
/// a fail. On expiry the process is killed outright; there is no
/// cooperative cancellation for shell scripts.
pub async fn run_script(
    script: &TestScript,
    shell: &str,
    timeout: Duration,
) -> Result<TestRecord, RunnerError> {
    let started = Instant::now();
    debug!(script = %script.name, "starting test script");

    let mut child = tokio::process::Command::new(shell)
        .arg(&script.path)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| RunnerError::SpawnFailed {
            script: script.name.clone(),
            message: e.to_string(),
        })?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    // Drain pipes concurrently so a chatty script cannot deadlock on a full
    // pipe buffer while we wait on it.
    let stdout_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(pipe) = stdout_pipe {
            let _ = BufReader::new(pipe).read_to_string(&mut buf).await;
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(pipe) = stderr_pipe {
            let _ = BufReader::new(pipe).read_to_string(&mut buf).await;
        }
        buf
    });

    let mut timed_out = false;
    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            warn!(script = %script.name, error = %e, "wait on test script failed");
            None
        }
        Err(_elapsed) => {
            timed_out = true;
            warn!(
                script = %script.name,
                timeout_secs = timeout.as_secs(),
                "test script timed out, killing"
            );
            let _ = child.start_kill();
            let _ = child.wait().await;
            None
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let duration_ms = started.elapsed().as_millis() as u64;

    let (status_result, exit_code, detail) = match status {
        Some(status) if status.success() => {
            (TestStatus::Passed, status.code(), "exit 0".to_string())
        }
        Some(status) => {
            let code = status.code().unwrap_or(-1);
            (TestStatus::Failed, status.code(), format!("exit {code}"))
        }
        None if timed_out => (
            TestStatus::Failed,
            None,
            format!("killed after {}s timeout", timeout.as_secs()),
        ),
        None => (TestStatus::Failed, None, "wait failed".to_string()),
    };

    Ok(TestRecord {
        name: script.name.clone(),
        status: status_result,
        duration_ms,
        detail,
        exit_code,
        stdout,
        stderr,
    })
}

/// Run every discovered script in `dir` sequentially and assemble a report.
///
/// `on_complete` fires as each script finishes, so the caller can print a
/// PASS/FAIL line while later scripts are still pending.
pub async fn run_dir(
    dir: &Path,
    config: &RunnerConfig,
    mut on_complete: impl FnMut(&TestRecord),
) -> Result<RunReport, RunnerError> {
    let scripts = discover_scripts(dir)?;
    let timeout = Duration::from_secs(config.script_timeout_secs);

    let mut records = Vec::with_capacity(scripts.len());
    for script in &scripts {
        let record = run_script(script, &config.shell, timeout).await?;
        on_complete(&record);
        records.push(record);
    }

    Ok(RunReport::new("scripts", records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_script(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_numbered_script_pattern() {
        assert!(is_numbered_script("01_es_health.sh"));
        assert!(is_numbered_script("10_chat"));
        assert!(!is_numbered_script("1_short.sh"));
        assert!(!is_numbered_script("notes.md"));
        assert!(!is_numbered_script("99_"));
        assert!(!is_numbered_script("ab_test.sh"));
    }

    #[test]
    fn test_discovery_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "02_second.sh", "exit 0\n");
        write_script(dir.path(), "01_first.sh", "exit 0\n");
        write_script(dir.path(), "10_last.sh", "exit 0\n");
        write_script(dir.path(), "README.md", "not a test\n");

        let scripts = discover_scripts(dir.path()).unwrap();
        let names: Vec<&str> = scripts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["01_first.sh", "02_second.sh", "10_last.sh"]);
    }

    #[test]
    fn test_discovery_missing_dir() {
        let err = discover_scripts(Path::new("/definitely/not/a/dir")).unwrap_err();
        assert!(matches!(err, RunnerError::DirNotFound { .. }));
    }

    #[test]
    fn test_discovery_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_scripts(dir.path()).unwrap_err();
        assert!(matches!(err, RunnerError::NoScripts { .. }));
    }

    #[tokio::test]
    async fn test_passing_and_failing_scripts_aggregate() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "01_pass.sh", "echo ok\nexit 0\n");
        write_script(dir.path(), "02_fail.sh", "echo broken >&2\nexit 3\n");
        write_script(dir.path(), "03_pass.sh", "exit 0\n");

        let config = RunnerConfig::default();
        let mut seen = Vec::new();
        let report = run_dir(dir.path(), &config, |r| seen.push(r.name.clone()))
            .await
            .unwrap();

        assert_eq!(seen, vec!["01_pass.sh", "02_fail.sh", "03_pass.sh"]);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.passed, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.summary.all_passed());

        let failing = &report.tests[1];
        assert_eq!(failing.status, TestStatus::Failed);
        assert_eq!(failing.exit_code, Some(3));
        assert!(failing.stderr.contains("broken"));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_fails_sleeping_script() {
        let dir = tempfile::tempdir().unwrap();
        // Sleeps well past the timeout, then would exit 0. Must still be failed.
        write_script(dir.path(), "01_hang.sh", "sleep 5\nexit 0\n");

        let script = TestScript {
            name: "01_hang.sh".into(),
            path: dir.path().join("01_hang.sh"),
        };
        let started = Instant::now();
        let record = run_script(&script, "sh", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(record.status, TestStatus::Failed);
        assert!(record.detail.contains("timeout"));
        assert!(record.exit_code.is_none());
        // Killed at the deadline, not after the full sleep.
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_fast_script_under_timeout_passes() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "01_quick.sh", "echo done\nexit 0\n");

        let script = TestScript {
            name: "01_quick.sh".into(),
            path: dir.path().join("01_quick.sh"),
        };
        let record = run_script(&script, "sh", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(record.status, TestStatus::Passed);
        assert_eq!(record.exit_code, Some(0));
        assert!(record.stdout.contains("done"));
    }
}
