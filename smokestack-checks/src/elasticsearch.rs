//! Read-only checks against the search index.
//!
//! Every request here is a GET or a read-only `_search`/`_count` POST; the
//! module exposes no mutating operation, which is how the "smoke tests
//! never write to the index" policy is enforced.

use crate::registry::{Check, CheckContext};
use async_trait::async_trait;
use serde_json::{Value, json};
use smokestack_core::error::CheckError;
use tracing::debug;

/// Allowed cluster-health states for a usable index.
const ALLOWED_HEALTH: [&str; 2] = ["yellow", "green"];

/// Build the read-only `match_phrase` search body used by the phrase checks.
fn phrase_query(content_field: &str, phrase: &str, source_field: &str, size: u64) -> Value {
    json!({
        "query": {
            "match_phrase": {
                content_field: { "query": phrase, "slop": 0 }
            }
        },
        "_source": [source_field],
        "size": size,
    })
}

/// Walk a dotted field path through a JSON object.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Extract `hits.total.value` from a search response.
fn total_hits(body: &Value) -> Result<u64, CheckError> {
    body.pointer("/hits/total/value")
        .and_then(Value::as_u64)
        .ok_or(CheckError::MissingField {
            field: "hits.total.value".into(),
        })
}

/// Extract one `_source` field from every hit in a search response.
fn hit_field_values(body: &Value, field: &str) -> Vec<String> {
    body.pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_source"))
                .filter_map(|source| lookup_path(source, field))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Search index root must answer 200.
pub struct EsRootCheck;

#[async_trait]
impl Check for EsRootCheck {
    fn name(&self) -> &str {
        "es_root"
    }

    fn description(&self) -> &str {
        "search index root endpoint answers HTTP 200"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/", ctx.config.endpoints.elasticsearch);
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

/// Cluster health must be yellow or green.
pub struct ClusterHealthCheck;

#[async_trait]
impl Check for ClusterHealthCheck {
    fn name(&self) -> &str {
        "es_cluster_health"
    }

    fn description(&self) -> &str {
        "cluster health status is yellow or green"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!("{}/_cluster/health", ctx.config.endpoints.elasticsearch);
        let body = ctx.probe.get_json(&url).await?;
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or(CheckError::MissingField {
                field: "status".into(),
            })?;
        if !ALLOWED_HEALTH.contains(&status) {
            return Err(CheckError::BadClusterHealth {
                status: status.to_string(),
                allowed: ALLOWED_HEALTH.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(format!("cluster health {status}"))
    }
}

/// The index must hold a plausible number of documents.
pub struct DocCountCheck;

#[async_trait]
impl Check for DocCountCheck {
    fn name(&self) -> &str {
        "es_doc_count"
    }

    fn description(&self) -> &str {
        "index document count is above the configured minimum"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let url = format!(
            "{}/{}/_count",
            ctx.config.endpoints.elasticsearch, ctx.config.index.name
        );
        let body = ctx.probe.get_json(&url).await?;
        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .ok_or(CheckError::MissingField {
                field: "count".into(),
            })?;
        let minimum = ctx.config.index.min_doc_count;
        if count < minimum {
            return Err(CheckError::CountBelowMinimum { count, minimum });
        }
        Ok(format!("{count} documents indexed"))
    }
}

/// The golden phrase must hit, and the golden file must be in the hit set.
pub struct GoldenPhraseCheck;

#[async_trait]
impl Check for GoldenPhraseCheck {
    fn name(&self) -> &str {
        "es_golden_phrase"
    }

    fn description(&self) -> &str {
        "golden phrase search returns hits including the expected file"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let index = &ctx.config.index;
        let golden = &ctx.config.golden;
        let url = format!(
            "{}/{}/_search",
            ctx.config.endpoints.elasticsearch, index.name
        );
        let query = phrase_query(
            &index.content_field,
            &golden.phrase,
            &index.filename_field,
            10,
        );
        let body = ctx.probe.post_json(&url, &query).await?;

        let hits = total_hits(&body)?;
        if hits == 0 {
            return Err(CheckError::NoHits {
                phrase: golden.phrase.clone(),
            });
        }

        let filenames = hit_field_values(&body, &index.filename_field);
        if !filenames.iter().any(|f| f == &golden.filename) {
            debug!(?filenames, "golden file not in hit set");
            return Err(CheckError::GoldenFileMissing {
                filename: golden.filename.clone(),
            });
        }
        Ok(format!("{hits} hits, golden file present"))
    }
}

/// Release matrix: expected-hit phrases must hit, expected-miss phrases
/// must not.
pub struct PhraseMatrixCheck;

#[async_trait]
impl Check for PhraseMatrixCheck {
    fn name(&self) -> &str {
        "es_phrase_matrix"
    }

    fn description(&self) -> &str {
        "expected-hit phrases return hits and expected-miss phrases return none"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let index = &ctx.config.index;
        let release = &ctx.config.release;
        let url = format!(
            "{}/{}/_search",
            ctx.config.endpoints.elasticsearch, index.name
        );

        for phrase in &release.expect_hit_phrases {
            let query = phrase_query(&index.content_field, phrase, &index.filename_field, 1);
            let body = ctx.probe.post_json(&url, &query).await?;
            if total_hits(&body)? == 0 {
                return Err(CheckError::NoHits {
                    phrase: phrase.clone(),
                });
            }
        }

        for phrase in &release.expect_miss_phrases {
            let query = phrase_query(&index.content_field, phrase, &index.filename_field, 1);
            let body = ctx.probe.post_json(&url, &query).await?;
            let hits = total_hits(&body)?;
            if hits > 0 {
                return Err(CheckError::UnexpectedHits {
                    phrase: phrase.clone(),
                    hits,
                });
            }
        }

        Ok(format!(
            "{} hit phrases, {} miss phrases verified",
            release.expect_hit_phrases.len(),
            release.expect_miss_phrases.len()
        ))
    }
}

/// Sample a batch of documents and fail if too many have empty content.
pub struct ContentSamplingCheck;

#[async_trait]
impl Check for ContentSamplingCheck {
    fn name(&self) -> &str {
        "es_content_sampling"
    }

    fn description(&self) -> &str {
        "fraction of sampled documents with empty content is below the ceiling"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let index = &ctx.config.index;
        let release = &ctx.config.release;
        let url = format!(
            "{}/{}/_search",
            ctx.config.endpoints.elasticsearch, index.name
        );
        let query = json!({
            "query": { "match_all": {} },
            "_source": [&index.content_field],
            "size": release.sample_size,
        });
        let body = ctx.probe.post_json(&url, &query).await?;

        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or(CheckError::MissingField {
                field: "hits.hits".into(),
            })?;

        let sampled = hits.len() as u64;
        if sampled == 0 {
            return Err(CheckError::NoHits {
                phrase: "match_all sample".into(),
            });
        }

        let empty = hits
            .iter()
            .filter(|hit| {
                hit.get("_source")
                    .and_then(|source| lookup_path(source, &index.content_field))
                    .and_then(Value::as_str)
                    .map(|content| content.trim().is_empty())
                    .unwrap_or(true)
            })
            .count() as u64;

        let ratio = empty as f64 / sampled as f64;
        if ratio > release.max_empty_ratio {
            return Err(CheckError::EmptyContentRatio {
                ratio,
                ceiling: release.max_empty_ratio,
                empty,
                sampled,
            });
        }
        Ok(format!("{empty}/{sampled} sampled docs empty"))
    }
}

/// A terms aggregation over the file-extension field must return buckets.
pub struct ExtensionAggCheck;

#[async_trait]
impl Check for ExtensionAggCheck {
    fn name(&self) -> &str {
        "es_extension_agg"
    }

    fn description(&self) -> &str {
        "terms aggregation over file extensions returns a non-empty bucket set"
    }

    async fn execute(&self, ctx: &CheckContext) -> Result<String, CheckError> {
        let index = &ctx.config.index;
        let url = format!(
            "{}/{}/_search",
            ctx.config.endpoints.elasticsearch, index.name
        );
        let query = json!({
            "size": 0,
            "aggs": {
                "by_extension": {
                    "terms": { "field": &index.extension_field, "size": 20 }
                }
            }
        });
        let body = ctx.probe.post_json(&url, &query).await?;

        let buckets = body
            .pointer("/aggregations/by_extension/buckets")
            .and_then(Value::as_array)
            .ok_or(CheckError::MissingField {
                field: "aggregations.by_extension.buckets".into(),
            })?;

        if buckets.is_empty() {
            return Err(CheckError::EmptyAggregation {
                agg: "by_extension".into(),
            });
        }

        let top: Vec<String> = buckets
            .iter()
            .take(3)
            .filter_map(|b| {
                let key = b.get("key")?.as_str()?;
                let count = b.get("doc_count")?.as_u64()?;
                Some(format!("{key}:{count}"))
            })
            .collect();
        Ok(format!("{} extensions ({})", buckets.len(), top.join(", ")))
    }
}
