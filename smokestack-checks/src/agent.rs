//! Checks against the agent API: health, model listing, chat completion
//! (non-streaming and streaming), and the file proxy.
//!
//! Chat answers are parsed and asserted on `choices[0].message.content`
//! rather than grepping the whole payload, so an expected literal hiding in
//! an unrelated field does not produce a false pass.

use crate::registry::{Check, CheckContext};
use async_trait::async_trait;
use serde_json::{Value, json};
use smokestack_core::error::CheckError;
use smokestack_core::sse;
use url::Url;

/// Extract the assistant answer from a non-streaming chat response.
fn answer_content(body: &Value) -> Result<String, CheckError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CheckError::MissingField {
            field: "choices[0].message.content".into(),
        })
}

/// Assert that an answer contains the expected literal and is not the
/// agent's fixed not-found response.
fn assert_answer(content: &str, expected: &str, not_found: &str) -> Result<(), CheckError> {
    if content.contains(not_found) {
        return Err(CheckError::NotFoundAnswer {
            answer: not_found.to_string(),
        });
    }
    if !content.contains(expected) {
        return Err(CheckError::AnswerMismatch {
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Build a single-turn chat request body.
fn chat_body(model: &str, prompt: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "stream": stream,
    })
}

/// Agent health endpoint must answer 200 with `ok: true`.
pub struct AgentHealthCheck;

#[async_trait]
impl Check for AgentHealthCheck {
    fn name(&self) -> &str {
        "agent_health"
    }

    fn description(&self) -> &str {
        "agent health endpoint reports ok"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/health", ctx.config.endpoints.agent);
        let body = ctx.probe.get_json(&url).await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(CheckError::MissingField { field: "ok".into() });
        }
        let service = body
            .get("service")
            .and_then(Value::as_str)
            .unwrap_or("agent");
        Ok(format!("{service} healthy"))
    }
}

/// Agent model listing must advertise the configured model id.
pub struct AgentModelsCheck;

#[async_trait]
impl Check for AgentModelsCheck {
    fn name(&self) -> &str {
        "agent_models"
    }

    fn description(&self) -> &str {
        "agent advertises the configured model id"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/v1/models", ctx.config.endpoints.agent);
        let body = ctx.probe.get_json(&url).await?;

        let ids: Vec<&str> = body
            .get("data")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();

        let model = &ctx.config.chat.model;
        if !ids.contains(&model.as_str()) {
            return Err(CheckError::ModelMissing {
                model: model.clone(),
            });
        }
        Ok(format!("model '{model}' advertised"))
    }
}

/// What a synthetic chat request is expected to answer with.
enum ChatProbeMode {
    /// Boot-gate probe: the fixed prompt must be acknowledged with the
    /// configured token.
    Acknowledge,
    /// Golden-path probe: the golden question's answer must cite the
    /// golden filename.
    GoldenCitation,
}

/// Non-streaming chat completion with a content assertion.
pub struct ChatCompletionCheck {
    mode: ChatProbeMode,
}

impl ChatCompletionCheck {
    /// Boot-gate variant: expect the acknowledgement token.
    pub fn acknowledge() -> Self {
        Self {
            mode: ChatProbeMode::Acknowledge,
        }
    }

    /// Golden-path variant: expect the golden filename in the answer.
    pub fn golden_citation() -> Self {
        Self {
            mode: ChatProbeMode::GoldenCitation,
        }
    }
}

#[async_trait]
impl Check for ChatCompletionCheck {
    fn name(&self) -> &str {
        match self.mode {
            ChatProbeMode::Acknowledge => "agent_chat_ack",
            ChatProbeMode::GoldenCitation => "agent_chat_golden",
        }
    }

    fn description(&self) -> &str {
        "non-streaming chat completion contains the expected literal"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let chat = &ctx.config.chat;
        let (prompt, expected) = match self.mode {
            ChatProbeMode::Acknowledge => (chat.probe_prompt.as_str(), chat.ack_token.as_str()),
            ChatProbeMode::GoldenCitation => (
                ctx.config.golden.question.as_str(),
                ctx.config.golden.filename.as_str(),
            ),
        };

        let url = format!("{}/v1/chat/completions", ctx.config.endpoints.agent);
        let text = ctx
            .probe
            .post_chat(&url, &chat_body(&chat.model, prompt, false))
            .await?;
        let body: Value = serde_json::from_str(&text).map_err(|_| CheckError::MissingField {
            field: "choices".into(),
        })?;

        let content = answer_content(&body)?;
        assert_answer(&content, expected, &chat.not_found_answer)?;
        Ok(format!("answer contains '{expected}'"))
    }
}

/// Streaming chat completion with the two framing invariants.
pub struct ChatStreamingCheck;

#[async_trait]
impl Check for ChatStreamingCheck {
    fn name(&self) -> &str {
        "agent_chat_stream"
    }

    fn description(&self) -> &str {
        "streaming chat completion is well-framed SSE terminated by [DONE]"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let chat = &ctx.config.chat;
        let url = format!("{}/v1/chat/completions", ctx.config.endpoints.agent);
        let body = ctx
            .probe
            .post_chat(&url, &chat_body(&chat.model, &chat.probe_prompt, true))
            .await?;

        let stats = sse::validate_stream(&body)?;
        Ok(format!("{} stream chunks, [DONE] observed", stats.chunk_lines))
    }
}

/// File proxy must serve a known-good path with 200 or 206.
pub struct FileProxyCheck;

#[async_trait]
impl Check for FileProxyCheck {
    fn name(&self) -> &str {
        "agent_file_proxy"
    }

    fn description(&self) -> &str {
        "file proxy serves a known-good path with 200 or 206"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let mut url = Url::parse(&format!("{}/open", ctx.config.endpoints.agent)).map_err(|e| {
            CheckError::MissingField {
                field: format!("endpoints.agent ({e})"),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("path", &ctx.config.golden.open_path);

        let status = ctx.probe.status(url.as_str()).await?;
        if status != 200 && status != 206 {
            return Err(CheckError::UnexpectedStatus {
                url: url.to_string(),
                expected: "200 or 206".into(),
                actual: status,
            });
        }
        Ok(format!("HTTP {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Byte-for-byte boot-gate fixtures from the stack's operational
    // runbooks: the acknowledgement answer and the not-found answer.
    const ACK_RESPONSE: &str = r#"{"id":"agentic_1700000000","object":"chat.completion","model":"agentic-rag","choices":[{"index":0,"message":{"role":"assistant","content":"OK"},"finish_reason":"stop"}]}"#;
    const NOT_FOUND_RESPONSE: &str = r#"{"id":"agentic_1700000001","object":"chat.completion","model":"agentic-rag","choices":[{"index":0,"message":{"role":"assistant","content":"Nicht in den Dokumenten gefunden"},"finish_reason":"stop"}]}"#;

    #[test]
    fn test_ack_fixture_passes() {
        assert!(ACK_RESPONSE.contains(r#""content":"OK""#));
        let body: Value = serde_json::from_str(ACK_RESPONSE).unwrap();
        let content = answer_content(&body).unwrap();
        assert_answer(&content, "OK", "Nicht in den Dokumenten gefunden").unwrap();
    }

    #[test]
    fn test_not_found_fixture_fails() {
        let body: Value = serde_json::from_str(NOT_FOUND_RESPONSE).unwrap();
        let content = answer_content(&body).unwrap();
        let err = assert_answer(&content, "OK", "Nicht in den Dokumenten gefunden").unwrap_err();
        assert!(matches!(err, CheckError::NotFoundAnswer { .. }));
    }

    #[test]
    fn test_missing_expected_literal_fails() {
        let err = assert_answer(
            "Die Anlage wird im Anhang beschrieben.",
            "betriebshandbuch.pdf",
            "Nicht in den Dokumenten gefunden",
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::AnswerMismatch { .. }));
    }

    #[test]
    fn test_expected_literal_outside_answer_field_not_matched() {
        // The token appearing only in an unrelated field (here: model) must
        // not satisfy the content assertion.
        let body: Value = serde_json::from_str(
            r#"{"model":"OK","choices":[{"index":0,"message":{"role":"assistant","content":"anders"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        let content = answer_content(&body).unwrap();
        assert_eq!(content, "anders");
        assert!(assert_answer(&content, "OK", "Nicht in den Dokumenten gefunden").is_err());
    }

    #[test]
    fn test_answer_content_missing() {
        let body: Value = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            answer_content(&body),
            Err(CheckError::MissingField { .. })
        ));
    }

    #[test]
    fn test_chat_body_shape() {
        let body = chat_body("agentic-rag", "Antworte nur mit OK.", true);
        assert_eq!(body["model"], "agentic-rag");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Antworte nur mit OK.");
    }
}
