//! SSE framing validation for the streaming chat endpoint.
//!
//! The agent streams OpenAI-style chunks: lines prefixed `data: ` carrying
//! JSON, terminated by the literal `data: [DONE]`. The harness validates
//! the framing of a captured stream body without interpreting the chunks
//! beyond extracting a little content for diagnostics.

use crate::error::SseError;
use serde_json::Value;

/// Prefix of every stream chunk line.
pub const DATA_PREFIX: &str = "data: ";

/// End-of-stream sentinel line.
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Summary of a validated stream body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseStats {
    /// Number of `data: ` lines observed (including the terminator).
    pub chunk_lines: usize,
    /// Content of the first delta that carried any, for diagnostics.
    pub first_content: Option<String>,
}

/// Validate the two framing invariants of a captured stream body:
/// the first non-empty line must be a `data: ` chunk, and the body must
/// contain the `data: [DONE]` terminator.
pub fn validate_stream(body: &str) -> Result<SseStats, SseError> {
    let mut chunk_lines = 0usize;
    let mut saw_done = false;
    let mut saw_any_line = false;
    let mut first_content = None;

    for raw in body.lines() {
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }
        if !saw_any_line {
            saw_any_line = true;
            if !line.starts_with(DATA_PREFIX) {
                return Err(SseError::BadLeadingLine {
                    line: line.to_string(),
                });
            }
        }
        if line == DONE_SENTINEL {
            saw_done = true;
            chunk_lines += 1;
            continue;
        }
        if line.starts_with(DATA_PREFIX) {
            chunk_lines += 1;
            if first_content.is_none()
                && let Some(chunk) = parse_sse_line(line)
            {
                first_content = delta_content(&chunk);
            }
        }
    }

    if !saw_any_line {
        return Err(SseError::Empty);
    }
    if chunk_lines == 0 {
        return Err(SseError::NoChunks);
    }
    if !saw_done {
        return Err(SseError::MissingTerminator);
    }

    Ok(SseStats {
        chunk_lines,
        first_content,
    })
}

/// Parse a single SSE data line. Returns the parsed JSON if valid.
pub fn parse_sse_line(line: &str) -> Option<Value> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    if data == "[DONE]" {
        return None;
    }
    serde_json::from_str(data).ok()
}

/// Extract `choices[0].delta.content` from a parsed stream chunk.
fn delta_content(chunk: &Value) -> Option<String> {
    chunk
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_STREAM: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hallo\"}}]}\n\n",
        "data: {\"choices\":[{\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    #[test]
    fn test_valid_stream_accepted() {
        let stats = validate_stream(GOOD_STREAM).unwrap();
        assert_eq!(stats.chunk_lines, 4);
        assert_eq!(stats.first_content.as_deref(), Some("Hallo"));
    }

    #[test]
    fn test_missing_terminator_rejected() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n";
        assert!(matches!(
            validate_stream(body),
            Err(SseError::MissingTerminator)
        ));
    }

    #[test]
    fn test_missing_chunks_rejected() {
        // A body with no `data: ` line at all fails on the leading-line rule.
        let body = "event: message\nretry: 100\n";
        assert!(matches!(
            validate_stream(body),
            Err(SseError::BadLeadingLine { .. })
        ));
    }

    #[test]
    fn test_bad_leading_line_rejected() {
        let body = concat!(
            ": comment before any chunk\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            "data: [DONE]\n",
        );
        assert!(matches!(
            validate_stream(body),
            Err(SseError::BadLeadingLine { .. })
        ));
    }

    #[test]
    fn test_empty_body_rejected() {
        assert!(matches!(validate_stream(""), Err(SseError::Empty)));
        assert!(matches!(validate_stream("\n\n"), Err(SseError::Empty)));
    }

    #[test]
    fn test_done_only_stream_accepted() {
        // The sentinel itself is a `data: ` line; a stream consisting only
        // of the terminator satisfies both framing invariants.
        let stats = validate_stream("data: [DONE]\n").unwrap();
        assert_eq!(stats.chunk_lines, 1);
        assert_eq!(stats.first_content, None);
    }

    #[test]
    fn test_parse_sse_line() {
        let line = r#"data: {"id":"chatcmpl-123","choices":[{"delta":{"content":"Hello"}}]}"#;
        let parsed = parse_sse_line(line).unwrap();
        assert_eq!(parsed["choices"][0]["delta"]["content"], "Hello");

        assert!(parse_sse_line("data: [DONE]").is_none());
        assert!(parse_sse_line("not a data line").is_none());
        assert!(parse_sse_line("data: not json").is_none());
    }
}
