//! Check against the LLM inference server.

use crate::registry::{Check, CheckContext};
use async_trait::async_trait;
use serde_json::Value;
use smokestack_core::error::CheckError;

/// The inference server must be reachable and advertise at least one model.
pub struct ModelsAvailableCheck;

#[async_trait]
impl Check for ModelsAvailableCheck {
    fn name(&self) -> &str {
        "llm_models"
    }

    fn description(&self) -> &str {
        "inference server advertises at least one loaded model"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/api/tags", ctx.config.endpoints.llm);
        let body = ctx.probe.get_json(&url).await?;

        let models = body
            .get("models")
            .and_then(Value::as_array)
            .ok_or(CheckError::MissingField {
                field: "models".into(),
            })?;
        if models.is_empty() {
            return Err(CheckError::MissingField {
                field: "models[0]".into(),
            });
        }

        let names: Vec<&str> = models
            .iter()
            .filter_map(|m| m.get("name").and_then(Value::as_str))
            .take(3)
            .collect();
        Ok(format!(
            "{} models available ({})",
            models.len(),
            names.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Check;

    #[test]
    fn test_check_identity() {
        let check = ModelsAvailableCheck;
        assert_eq!(check.name(), "llm_models");
        assert!(!check.description().is_empty());
    }
}
