/// Wire mapping for the minimal (single-agent MVP) backend contract.
///
/// Three endpoints plus health: `POST /register` creates an agent and
/// returns its API key, `POST /metrics` ingests one report, and
/// `GET /stats/{agent_id}` returns a reduced aggregate. Everything else is
/// either degraded (listings fall back to the client-side cache) or
/// unsupported (session auth does not exist here).
use serde::{Deserialize, Serialize};

use super::backend::{Backend, Creds};
use super::error::{ApiError, Result};
use super::http::{Auth, Transport};
use super::types::{
    ApiKeyRecord, Evaluation, EvaluationFilter, EvaluationStats, HealthStatus, MetricReport, User,
};

/// The minimal single-agent backend.
pub(crate) struct MinimalBackend;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RegisterAgentRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct RegisterAgentResponse {
    agent_id: String,
    api_key: String,
}

/// The reduced aggregate served by `GET /stats/{agent_id}`.
///
/// Field names differ from the full contract and three averages are absent
/// entirely; [`map_agent_stats`] normalizes both. The fields are optional
/// because the backing view computes SQL aggregates — an average over zero
/// rows arrives as an explicit `null`, not a missing key.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentStats {
    total_evals: Option<u64>,
    total_hallucinations: Option<u64>,
    avg_hallucination_prob: Option<f64>,
    avg_latency: Option<f64>,
    avg_throughput: Option<f64>,
}

/// `POST /metrics` body: same metrics as the full contract, but the model
/// field is named `model` and loose metadata rides in `meta`.
#[derive(Serialize)]
struct MetricsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retrieved_docs: Option<&'a [String]>,
    semantic_drift: f64,
    factual_support: f64,
    uncertainty: f64,
    hallucination_probability: f64,
    hallucinated: bool,
    latency_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    throughput_qps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct MetricsResponse {
    eval_id: String,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Normalize the reduced aggregate onto the stable stats shape. Absent or
/// null fields come back as zero, never as a hole the caller has to probe.
fn map_agent_stats(raw: AgentStats) -> EvaluationStats {
    EvaluationStats {
        total_evaluations: raw.total_evals.unwrap_or(0),
        total_hallucinations: raw.total_hallucinations.unwrap_or(0),
        hallucination_rate: raw.avg_hallucination_prob.unwrap_or(0.0),
        avg_latency: raw.avg_latency.unwrap_or(0.0),
        avg_throughput: raw.avg_throughput.unwrap_or(0.0),
        // Not reported by this contract.
        avg_semantic_drift: 0.0,
        avg_uncertainty: 0.0,
        avg_factual_support: 0.0,
    }
}

fn build_metrics_request(report: &MetricReport) -> MetricsRequest<'_> {
    // agent_name / session_id / mode have no first-class columns here;
    // they ride in the free-form meta object.
    let mut meta = serde_json::Map::new();
    meta.insert("mode".to_string(), report.mode.clone().into());
    if let Some(agent) = &report.agent_name {
        meta.insert("agent_name".to_string(), agent.clone().into());
    }
    if let Some(session) = &report.session_id {
        meta.insert("session_id".to_string(), session.clone().into());
    }

    MetricsRequest {
        model: report.model_name.as_deref(),
        prompt: &report.prompt,
        response: &report.response,
        retrieved_docs: report.retrieved_docs.as_deref(),
        semantic_drift: report.semantic_drift,
        factual_support: report.factual_support,
        uncertainty: report.uncertainty,
        hallucination_probability: report.hallucination_probability,
        hallucinated: report.hallucinated,
        latency_sec: report.latency_sec,
        throughput_qps: report.throughput_qps,
        meta: Some(serde_json::Value::Object(meta)),
    }
}

/// The agent id whose stats to fetch: the explicit filter when given,
/// otherwise the cached record matching the active key.
fn resolve_agent_id(creds: &Creds, agent: Option<&str>) -> Option<String> {
    if let Some(agent) = agent {
        return Some(agent.to_string());
    }
    let active = creds.api_key.as_deref()?;
    creds
        .cached_keys
        .iter()
        .find(|record| record.key == active)
        .map(|record| record.id.clone())
}

// ---------------------------------------------------------------------------
// Backend impl
// ---------------------------------------------------------------------------

impl Backend for MinimalBackend {
    fn login(&self, _http: &Transport, _email: &str, _password: &str) -> Result<String> {
        Err(ApiError::Unsupported("login"))
    }

    fn register(
        &self,
        _http: &Transport,
        _email: &str,
        _password: &str,
        _full_name: Option<&str>,
    ) -> Result<()> {
        Err(ApiError::Unsupported("user registration"))
    }

    fn current_user(&self, _http: &Transport, _creds: &Creds) -> Result<User> {
        Err(ApiError::Unsupported("session identity"))
    }

    /// `POST /register` creates an agent and returns its key — this
    /// contract's version of key creation. The endpoint reports no
    /// timestamp, so `created_at` is stamped client-side.
    fn create_api_key(&self, http: &Transport, _creds: &Creds, name: &str) -> Result<ApiKeyRecord> {
        let resp: RegisterAgentResponse =
            http.post_json("/register", Auth::None, &RegisterAgentRequest { name })?;
        Ok(ApiKeyRecord {
            id: resp.agent_id,
            name: name.to_string(),
            key: resp.api_key,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_used_at: None,
            is_active: true,
        })
    }

    /// No listing endpoint — the caller degrades to its cached collection.
    fn list_api_keys(
        &self,
        _http: &Transport,
        _creds: &Creds,
    ) -> Result<Option<Vec<ApiKeyRecord>>> {
        Ok(None)
    }

    /// No deletion endpoint — removal is local-only, handled by the caller.
    fn delete_api_key(&self, _http: &Transport, _creds: &Creds, _id: &str) -> Result<()> {
        Ok(())
    }

    fn stats(
        &self,
        http: &Transport,
        creds: &Creds,
        _days: u32,
        agent: Option<&str>,
    ) -> Result<EvaluationStats> {
        // This contract aggregates over the agent's whole history; the
        // window parameter has nothing to bind to.
        let Some(agent_id) = resolve_agent_id(creds, agent) else {
            return Ok(EvaluationStats::default());
        };
        let path = format!("/stats/{agent_id}");
        let raw: AgentStats = http.get_json(&path, Auth::ApiKey(creds.require_api_key()?))?;
        Ok(map_agent_stats(raw))
    }

    /// No listing endpoint — an empty sequence is the degradation contract.
    fn list_evaluations(
        &self,
        _http: &Transport,
        _creds: &Creds,
        _filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>> {
        Ok(Vec::new())
    }

    fn get_evaluation(&self, _http: &Transport, _creds: &Creds, _id: &str) -> Result<Evaluation> {
        Err(ApiError::Unsupported("evaluation lookup"))
    }

    fn delete_evaluation(&self, _http: &Transport, _creds: &Creds, _id: &str) -> Result<()> {
        Err(ApiError::Unsupported("evaluation deletion"))
    }

    fn submit(&self, http: &Transport, creds: &Creds, report: &MetricReport) -> Result<String> {
        let resp: MetricsResponse = http.post_json(
            "/metrics",
            Auth::ApiKey(creds.require_api_key()?),
            &build_metrics_request(report),
        )?;
        Ok(resp.eval_id)
    }

    fn submit_batch(
        &self,
        _http: &Transport,
        _creds: &Creds,
        _reports: &[MetricReport],
    ) -> Result<usize> {
        Err(ApiError::Unsupported("batch submission"))
    }

    fn health(&self, http: &Transport) -> Result<HealthStatus> {
        http.get_json("/health", Auth::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_stats_normalize_names_and_zero_fill() {
        let raw: AgentStats = serde_json::from_str(
            r#"{"agent_id":"a1","total_evals":12,"total_hallucinations":2,"avg_hallucination_prob":0.17,"avg_latency":1.1,"avg_throughput":0.9}"#,
        )
        .unwrap();
        let stats = map_agent_stats(raw);
        assert_eq!(stats.total_evaluations, 12);
        assert_eq!(stats.hallucination_rate, 0.17);
        assert_eq!(stats.avg_semantic_drift, 0.0);
        assert_eq!(stats.avg_uncertainty, 0.0);
        assert_eq!(stats.avg_factual_support, 0.0);
    }

    #[test]
    fn agent_stats_tolerate_missing_fields() {
        let raw: AgentStats = serde_json::from_str(r#"{"agent_id":"a1"}"#).unwrap();
        let stats = map_agent_stats(raw);
        assert_eq!(stats, EvaluationStats::default());
    }

    #[test]
    fn agent_stats_tolerate_null_aggregates() {
        let raw: AgentStats = serde_json::from_str(
            r#"{"agent_id":"a1","total_evals":0,"total_hallucinations":0,"avg_hallucination_prob":null,"avg_latency":null,"avg_throughput":null}"#,
        )
        .unwrap();
        let stats = map_agent_stats(raw);
        assert_eq!(stats, EvaluationStats::default());
    }

    #[test]
    fn metrics_request_renames_model_and_packs_meta() {
        let report = MetricReport {
            prompt: "q".into(),
            response: "a".into(),
            retrieved_docs: None,
            semantic_drift: 0.2,
            uncertainty: 0.1,
            factual_support: 0.8,
            hallucination_probability: 0.12,
            hallucinated: false,
            latency_sec: 1.1,
            throughput_qps: Some(0.9),
            mode: "self-check".into(),
            model_name: Some("gpt-4o-mini".into()),
            agent_name: Some("qa_bot".into()),
            session_id: None,
        };
        let json = serde_json::to_value(build_metrics_request(&report)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert!(json.get("model_name").is_none());
        assert_eq!(json["meta"]["mode"], "self-check");
        assert_eq!(json["meta"]["agent_name"], "qa_bot");
        assert!(json["meta"].get("session_id").is_none());
    }

    #[test]
    fn resolve_agent_id_prefers_explicit_filter() {
        let creds = Creds {
            token: None,
            api_key: Some("halo_k1".into()),
            cached_keys: vec![ApiKeyRecord {
                id: "agent-1".into(),
                name: "default".into(),
                key: "halo_k1".into(),
                created_at: String::new(),
                last_used_at: None,
                is_active: true,
            }],
        };
        assert_eq!(
            resolve_agent_id(&creds, Some("agent-9")).as_deref(),
            Some("agent-9")
        );
        assert_eq!(resolve_agent_id(&creds, None).as_deref(), Some("agent-1"));

        let empty = Creds::default();
        assert_eq!(resolve_agent_id(&empty, None), None);
    }
}
