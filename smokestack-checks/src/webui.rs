//! Check against the web UI.

use crate::registry::{Check, CheckContext};
use async_trait::async_trait;
use smokestack_core::error::CheckError;

/// Web UI root must answer 200.
pub struct WebUiRootCheck;

#[async_trait]
impl Check for WebUiRootCheck {
    fn name(&self) -> &str {
        "webui_root"
    }

    fn description(&self) -> &str {
        "web UI root endpoint answers HTTP 200"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/", ctx.config.endpoints.webui);
        let status = ctx.probe.status(&url).await?;
        if status != 200 {
            return Err(CheckError::UnexpectedStatus {
                url,
                expected: "200".into(),
                actual: status,
            });
        }
        Ok("HTTP 200".into())
    }
}
