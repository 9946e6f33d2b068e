//! Error types for the Smokestack core.
//!
//! Uses `thiserror` for structured error variants covering HTTP probing,
//! stream framing, check execution, stack lifecycle, the script runner,
//! and configuration.

use std::path::PathBuf;

/// Top-level error type for the Smokestack libraries.
#[derive(Debug, thiserror::Error)]
pub enum SmokestackError {
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Stream error: {0}")]
    Sse(#[from] SseError),

    #[error("Check error: {0}")]
    Check(#[from] CheckError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from HTTP probing of stack services.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("invalid JSON from {url}: {message}")]
    Json { url: String, message: String },

    #[error("invalid probe URL '{url}': {message}")]
    Url { url: String, message: String },

    #[error("failed to build HTTP client: {message}")]
    Client { message: String },

    #[error("service '{service}' not ready after {tries} polls of {url} (last outcome: {last})")]
    NotReady {
        service: String,
        url: String,
        tries: u32,
        last: String,
    },
}

/// Errors from SSE stream framing validation.
#[derive(Debug, thiserror::Error)]
pub enum SseError {
    #[error("stream body is empty")]
    Empty,

    #[error("first stream line is not a data chunk: {line}")]
    BadLeadingLine { line: String },

    #[error("stream contains no 'data: ' chunk lines")]
    NoChunks,

    #[error("stream is missing the 'data: [DONE]' terminator")]
    MissingTerminator,
}

/// Errors from individual contract checks.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("expected HTTP {expected} from {url}, got {actual}")]
    UnexpectedStatus {
        url: String,
        expected: String,
        actual: u16,
    },

    #[error("response field '{field}' is missing or has the wrong type")]
    MissingField { field: String },

    #[error("cluster health is '{status}', expected one of {allowed:?}")]
    BadClusterHealth { status: String, allowed: Vec<String> },

    #[error("document count {count} is below the minimum of {minimum}")]
    CountBelowMinimum { count: u64, minimum: u64 },

    #[error("phrase '{phrase}' returned no hits")]
    NoHits { phrase: String },

    #[error("phrase '{phrase}' expected to miss but returned {hits} hits")]
    UnexpectedHits { phrase: String, hits: u64 },

    #[error("expected file '{filename}' not present in the hit set")]
    GoldenFileMissing { filename: String },

    #[error("answer does not contain the expected literal '{expected}'")]
    AnswerMismatch { expected: String },

    #[error("answer is the not-found response: {answer}")]
    NotFoundAnswer { answer: String },

    #[error("stream framing invalid: {0}")]
    StreamFraming(#[from] SseError),

    #[error("empty-content ratio {ratio:.2} exceeds the ceiling of {ceiling:.2} ({empty}/{sampled} sampled docs empty)")]
    EmptyContentRatio {
        ratio: f64,
        ceiling: f64,
        empty: u64,
        sampled: u64,
    },

    #[error("aggregation '{agg}' returned no buckets")]
    EmptyAggregation { agg: String },

    #[error("model '{model}' is not advertised by the server")]
    ModelMissing { model: String },

    #[error("check '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Errors from the stack lifecycle controller.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("compose config validation failed: {stderr}")]
    InvalidComposeConfig { stderr: String },

    #[error("'{command}' exited with status {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to spawn '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    #[error("service '{service}' did not become ready: {source}")]
    ServiceNotReady {
        service: String,
        #[source]
        source: ProbeError,
    },

    #[error("boot gate failed: {failed} of {total} checks did not pass")]
    BootGateFailed { failed: usize, total: usize },

    #[error("failed to write snapshot to {path}: {message}")]
    SnapshotFailed { path: PathBuf, message: String },
}

/// Errors from the external-script test runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("test directory not found: {dir}")]
    DirNotFound { dir: PathBuf },

    #[error("no test scripts matching NN_name found in {dir}")]
    NoScripts { dir: PathBuf },

    #[error("failed to spawn test script '{script}': {message}")]
    SpawnFailed { script: String, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `SmokestackError`.
pub type Result<T> = std::result::Result<T, SmokestackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_probe() {
        let err = SmokestackError::Probe(ProbeError::Status {
            url: "http://localhost:9200/".into(),
            status: 503,
        });
        assert_eq!(
            err.to_string(),
            "Probe error: http://localhost:9200/ returned HTTP 503"
        );
    }

    #[test]
    fn test_error_display_not_ready() {
        let err = ProbeError::NotReady {
            service: "elasticsearch".into(),
            url: "http://localhost:9200/".into(),
            tries: 60,
            last: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "service 'elasticsearch' not ready after 60 polls of http://localhost:9200/ (last outcome: connection refused)"
        );
    }

    #[test]
    fn test_error_display_check() {
        let err = CheckError::CountBelowMinimum {
            count: 12,
            minimum: 1000,
        };
        assert_eq!(
            err.to_string(),
            "document count 12 is below the minimum of 1000"
        );

        let err = CheckError::BadClusterHealth {
            status: "red".into(),
            allowed: vec!["yellow".into(), "green".into()],
        };
        assert!(err.to_string().contains("'red'"));
    }

    #[test]
    fn test_error_display_sse() {
        let err = CheckError::StreamFraming(SseError::MissingTerminator);
        assert_eq!(
            err.to_string(),
            "stream framing invalid: stream is missing the 'data: [DONE]' terminator"
        );
    }

    #[test]
    fn test_error_display_lifecycle() {
        let err = LifecycleError::CommandFailed {
            command: "docker compose up -d".into(),
            code: 17,
            stderr: "no such service".into(),
        };
        assert_eq!(
            err.to_string(),
            "'docker compose up -d' exited with status 17: no such service"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SmokestackError = io_err.into();
        assert!(matches!(err, SmokestackError::Io(_)));
    }
}
