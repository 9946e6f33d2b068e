//! Run reports and pass/fail aggregation.
//!
//! Every suite run and script run produces per-test records, an aggregate
//! summary computed by a pure fold, and optionally a JSON report artifact
//! written once per run.

use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Outcome status of a single check or test script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Passed => write!(f, "PASS"),
            TestStatus::Failed => write!(f, "FAIL"),
        }
    }
}

/// Result of one executed contract check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub status: TestStatus,
    /// Success detail or failure diagnostic.
    pub detail: String,
    pub duration_ms: u64,
}

impl CheckOutcome {
    pub fn passed(name: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            detail: detail.into(),
            duration_ms,
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            detail: detail.into(),
            duration_ms,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// Result of one executed test, with process details when the test was an
/// external script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl From<CheckOutcome> for TestRecord {
    fn from(outcome: CheckOutcome) -> Self {
        Self {
            name: outcome.name,
            status: outcome.status,
            duration_ms: outcome.duration_ms,
            detail: outcome.detail,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Aggregate pass/fail counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub status: TestStatus,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Fold a sequence of per-test statuses into an aggregate summary.
///
/// `passed` is the count of passing results, `failed` is the remainder, and
/// the overall status is passing iff nothing failed.
pub fn summarize<I>(statuses: I) -> RunSummary
where
    I: IntoIterator<Item = TestStatus>,
{
    let (mut total, mut passed) = (0usize, 0usize);
    for status in statuses {
        total += 1;
        if status == TestStatus::Passed {
            passed += 1;
        }
    }
    let failed = total - passed;
    RunSummary {
        total,
        passed,
        failed,
        status: if failed == 0 {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        },
    }
}

/// JSON report artifact written once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: String,
    pub suite: String,
    pub tests: Vec<TestRecord>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Assemble a report from per-test records, computing the summary.
    pub fn new(suite: impl Into<String>, tests: Vec<TestRecord>) -> Self {
        let summary = summarize(tests.iter().map(|t| t.status));
        Self {
            timestamp: Utc::now().to_rfc3339(),
            suite: suite.into(),
            tests,
            summary,
        }
    }

    /// Write the report as pretty-printed JSON under `dir`, returning the
    /// written path. The filename carries the suite name and a timestamp so
    /// successive runs never overwrite each other.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("{}-{stamp}.json", self.suite));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}
