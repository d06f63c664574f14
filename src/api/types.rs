//! Data model shared by the adapter and the CLI.
//!
//! All timestamps are RFC 3339 strings as sent by the backend; the client
//! only ever produces them (via `chrono`) when it has to stamp a record
//! itself. Stats structs deserialize with field-level defaults so that a
//! backend omitting a field yields `0`, never an absent value — rendering
//! code can always do arithmetic on them.

use serde::{Deserialize, Serialize};

/// An authenticated user of the monitoring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: String,
}

/// One API key, as held in the client-side cache.
///
/// `key` carries the full secret exactly once — in the record returned by
/// key creation. Records coming from a server-side listing carry the masked
/// preview instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub name: String,
    pub key: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_used_at: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Aggregate counters over a time window, as rendered by the stats panel.
///
/// Every numeric field deserializes to `0` when the backend omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationStats {
    pub total_evaluations: u64,
    pub total_hallucinations: u64,
    pub hallucination_rate: f64,
    pub avg_latency: f64,
    pub avg_throughput: f64,
    pub avg_semantic_drift: f64,
    pub avg_uncertainty: f64,
    pub avg_factual_support: f64,
}

/// One recorded judgment of a prompt/response pair.
///
/// Read-only from the adapter's perspective. Defaults are deliberately
/// permissive: a half-populated row from an older backend still renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Evaluation {
    pub id: String,
    pub prompt: String,
    pub response: String,
    pub retrieved_docs: Option<Vec<String>>,
    pub semantic_drift: f64,
    pub uncertainty: f64,
    pub factual_support: f64,
    pub hallucination_probability: f64,
    pub hallucinated: bool,
    pub latency_sec: f64,
    pub throughput_qps: Option<f64>,
    pub mode: String,
    pub model_name: Option<String>,
    pub agent_name: Option<String>,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// The submit-side shape of an evaluation: what an agent reports after
/// judging one prompt/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReport {
    pub prompt: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_docs: Option<Vec<String>>,
    pub semantic_drift: f64,
    pub uncertainty: f64,
    pub factual_support: f64,
    pub hallucination_probability: f64,
    pub hallucinated: bool,
    pub latency_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_qps: Option<f64>,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Filters accepted by the evaluation listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct EvaluationFilter {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub agent_name: Option<String>,
    pub hallucinated: Option<bool>,
    /// RFC 3339 lower bound on `created_at`.
    pub start_date: Option<String>,
    /// RFC 3339 upper bound on `created_at`.
    pub end_date: Option<String>,
}

/// Liveness probe result. Both backend flavors' health payloads fit here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}
