//! Configuration system for Smokestack.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Configuration is loaded from `~/.config/smokestack/config.toml` and/or
//! `smokestack.toml` in the workspace directory; environment variables use the
//! `SMOKESTACK_` prefix with `__` as the section separator
//! (e.g. `SMOKESTACK_ENDPOINTS__AGENT`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for the harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub endpoints: EndpointsConfig,
    pub index: IndexConfig,
    pub chat: ChatConfig,
    pub golden: GoldenConfig,
    pub readiness: ReadinessConfig,
    pub http: HttpConfig,
    pub runner: RunnerConfig,
    pub compose: ComposeConfig,
    pub release: ReleaseConfig,
    pub report: ReportConfig,
}

/// Base URLs of the stack services under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Search index (Elasticsearch) base URL.
    pub elasticsearch: String,
    /// LLM inference server (Ollama-compatible) base URL.
    pub llm: String,
    /// Agent API base URL.
    pub agent: String,
    /// Web UI base URL.
    pub webui: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            elasticsearch: "http://localhost:9200".to_string(),
            llm: "http://localhost:11434".to_string(),
            agent: "http://localhost:8000".to_string(),
            webui: "http://localhost:3000".to_string(),
        }
    }
}

/// Search index parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name queried by all read-only search checks.
    pub name: String,
    /// Minimum plausible document count for a populated index.
    pub min_doc_count: u64,
    /// Field holding extracted document text.
    pub content_field: String,
    /// Field holding the source filename.
    pub filename_field: String,
    /// Field holding the file extension, used by the aggregation check.
    pub extension_field: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "rag_files_v1".to_string(),
            min_doc_count: 1000,
            content_field: "content".to_string(),
            filename_field: "file.filename".to_string(),
            extension_field: "file.extension".to_string(),
        }
    }
}

/// Chat-completion check parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model id the agent is expected to advertise and accept.
    pub model: String,
    /// Prompt used by the synthetic boot-gate chat request.
    pub probe_prompt: String,
    /// Literal the boot-gate answer must contain.
    pub ack_token: String,
    /// The agent's fixed "nothing found in the documents" answer; a chat
    /// check that receives it fails even when the expected literal appears.
    pub not_found_answer: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "agentic-rag".to_string(),
            probe_prompt: "Antworte nur mit OK.".to_string(),
            ack_token: "OK".to_string(),
            not_found_answer: "Nicht in den Dokumenten gefunden".to_string(),
        }
    }
}

/// The golden-path regression fixture: a query with a known-good result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenConfig {
    /// Literal phrase that must return at least one hit.
    pub phrase: String,
    /// Filename expected to appear in the golden hit set.
    pub filename: String,
    /// Question whose answer is expected to cite the golden filename.
    pub question: String,
    /// Known-good absolute path for the file-proxy check.
    pub open_path: String,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self {
            phrase: "Inbetriebnahme der Anlage".to_string(),
            filename: "betriebshandbuch.pdf".to_string(),
            question: "In welchem Dokument ist die Inbetriebnahme der Anlage beschrieben?"
                .to_string(),
            open_path: "/data/docs/betriebshandbuch.pdf".to_string(),
        }
    }
}

/// Startup readiness polling budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Maximum number of polls per service.
    pub tries: u32,
    /// Fixed sleep between polls, in seconds.
    pub interval_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            tries: 60,
            interval_secs: 2,
        }
    }
}

/// HTTP client bounds. Every request the harness makes is bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Total request timeout for ordinary probes, in seconds.
    pub request_timeout_secs: u64,
    /// Total request timeout for chat-completion requests, in seconds.
    pub chat_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 2,
            request_timeout_secs: 5,
            chat_timeout_secs: 20,
        }
    }
}

/// External-script runner parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Hard wall-clock timeout per test script, in seconds.
    pub script_timeout_secs: u64,
    /// Interpreter used to execute test scripts.
    pub shell: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            script_timeout_secs: 30,
            shell: "sh".to_string(),
        }
    }
}

/// Container orchestrator invocation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Container runtime binary; compose is invoked as `<binary> compose ...`.
    pub binary: String,
    /// Optional explicit compose file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Grace period passed to `compose stop -t`, in seconds.
    pub stop_grace_secs: u64,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            file: None,
            stop_grace_secs: 10,
        }
    }
}

/// Release-suite matrix and sampling thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Phrases that must each return at least one hit.
    pub expect_hit_phrases: Vec<String>,
    /// Phrases that must return zero hits.
    pub expect_miss_phrases: Vec<String>,
    /// Number of documents sampled by the content-quality check.
    pub sample_size: u64,
    /// Maximum tolerated fraction of sampled documents with empty content.
    pub max_empty_ratio: f64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            expect_hit_phrases: vec!["Inbetriebnahme der Anlage".to_string()],
            expect_miss_phrases: vec!["xqzzy kein solcher Wortlaut vorhanden".to_string()],
            sample_size: 50,
            max_empty_ratio: 0.2,
        }
    }
}

/// Report and snapshot output location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory for JSON run reports and stop-time snapshots.
    /// Defaults to the platform data directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { dir: None }
    }
}

impl ReportConfig {
    /// Resolve the report directory, falling back to the platform data dir.
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("dev", "smokestack", "smokestack")
            .map(|d| d.data_dir().join("reports"))
            .unwrap_or_else(|| PathBuf::from("reports"))
    }
}

/// Load the layered harness configuration.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&HarnessConfig>,
) -> std::result::Result<HarnessConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(HarnessConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "smokestack", "smokestack") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join("smokestack.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (SMOKESTACK_ENDPOINTS__AGENT, SMOKESTACK_INDEX__NAME, ...)
    figment = figment.merge(Env::prefixed("SMOKESTACK_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Check whether any Smokestack configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "smokestack", "smokestack")
        && config_dir.config_dir().join("config.toml").exists()
    {
        return true;
    }
    if let Some(ws) = workspace
        && ws.join("smokestack.toml").exists()
    {
        return true;
    }
    false
}
