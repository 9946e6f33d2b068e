//! Suite assembly: boot gate, small suite, and release suite.
//!
//! The boot gate aborts on the first failure (it gates startup), while the
//! small and release suites run every check and aggregate. That asymmetry
//! is part of the operational contract, not an accident.

use crate::agent::{
    AgentHealthCheck, AgentModelsCheck, ChatCompletionCheck, ChatStreamingCheck, FileProxyCheck,
};
use crate::elasticsearch::{
    ClusterHealthCheck, ContentSamplingCheck, DocCountCheck, EsRootCheck, ExtensionAggCheck,
    GoldenPhraseCheck, PhraseMatrixCheck,
};
use crate::llm::ModelsAvailableCheck;
use crate::registry::{CheckContext, CheckRegistry, FailureMode};
use crate::webui::WebUiRootCheck;
use smokestack_core::report::{CheckOutcome, RunReport, TestRecord};
use std::sync::Arc;

/// The three check suites the harness knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Startup gate: minimal sanity before the stack is considered usable.
    BootGate,
    /// Fast read-only matrix, intended to run after every change.
    Small,
    /// Broader read-only matrix, intended to run before tagging a release.
    Release,
}

impl Suite {
    pub fn name(&self) -> &'static str {
        match self {
            Suite::BootGate => "boot-gate",
            Suite::Small => "small",
            Suite::Release => "release",
        }
    }

    pub fn failure_mode(&self) -> FailureMode {
        match self {
            Suite::BootGate => FailureMode::AbortOnFailure,
            Suite::Small | Suite::Release => FailureMode::RunToCompletion,
        }
    }

    /// Assemble the suite's checks in execution order.
    pub fn registry(&self) -> CheckRegistry {
        let mut registry = CheckRegistry::new();
        match self {
            Suite::BootGate => {
                registry.register(Arc::new(ClusterHealthCheck));
                registry.register(Arc::new(DocCountCheck));
                registry.register(Arc::new(ChatCompletionCheck::acknowledge()));
            }
            Suite::Small => {
                register_small(&mut registry);
            }
            Suite::Release => {
                register_small(&mut registry);
                registry.register(Arc::new(PhraseMatrixCheck));
                registry.register(Arc::new(ContentSamplingCheck));
                registry.register(Arc::new(ExtensionAggCheck));
            }
        }
        registry
    }
}

fn register_small(registry: &mut CheckRegistry) {
    registry.register(Arc::new(EsRootCheck));
    registry.register(Arc::new(ClusterHealthCheck));
    registry.register(Arc::new(DocCountCheck));
    registry.register(Arc::new(GoldenPhraseCheck));
    registry.register(Arc::new(ModelsAvailableCheck));
    registry.register(Arc::new(AgentHealthCheck));
    registry.register(Arc::new(AgentModelsCheck));
    registry.register(Arc::new(ChatCompletionCheck::golden_citation()));
    registry.register(Arc::new(ChatStreamingCheck));
    registry.register(Arc::new(FileProxyCheck));
    registry.register(Arc::new(WebUiRootCheck));
}

/// Run a suite and assemble its report.
///
/// `on_complete` fires after each check so the caller can print progress
/// lines while the suite is still running.
pub async fn run_suite(
    suite: Suite,
    ctx: &CheckContext,
    on_complete: impl FnMut(&CheckOutcome),
) -> RunReport {
    let registry = suite.registry();
    let outcomes = registry.run(ctx, suite.failure_mode(), on_complete).await;
    RunReport::new(
        suite.name(),
        outcomes.into_iter().map(TestRecord::from).collect(),
    )
}
