/// Wire mapping for the full (multi-tenant) backend contract.
///
/// Session endpoints live under `/auth/*` and take a JWT bearer token;
/// evaluation ingest endpoints take an `X-API-Key` header. Server-side key
/// listings return a masked preview instead of the secret — the preview is
/// mapped into [`ApiKeyRecord::key`] so the cache never holds a secret it
/// was not explicitly handed.
use serde::{Deserialize, Serialize};

use super::backend::{Backend, Creds};
use super::error::{ApiError, Result};
use super::http::{Auth, Transport};
use super::types::{
    ApiKeyRecord, Evaluation, EvaluationFilter, EvaluationStats, HealthStatus, MetricReport, User,
};

/// The full multi-tenant backend.
pub(crate) struct FullBackend;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Serialize)]
struct KeyCreateRequest<'a> {
    name: &'a str,
}

/// Listing item: the server withholds the secret and sends a preview.
#[derive(Deserialize)]
struct KeyListItem {
    id: String,
    name: String,
    key_preview: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    last_used_at: Option<String>,
    #[serde(default)]
    is_active: bool,
}

impl From<KeyListItem> for ApiKeyRecord {
    fn from(item: KeyListItem) -> Self {
        ApiKeyRecord {
            id: item.id,
            name: item.name,
            key: item.key_preview,
            created_at: item.created_at,
            last_used_at: item.last_used_at,
            is_active: item.is_active,
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    evaluations: &'a [MetricReport],
}

#[derive(Deserialize)]
struct BatchResponse {
    count: usize,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

/// Build the stats query: `?days=N[&agent_name=X]`.
fn stats_query(days: u32, agent: Option<&str>) -> String {
    let mut query = format!("?days={days}");
    if let Some(agent) = agent {
        query.push_str(&format!("&agent_name={}", urlencoding::encode(agent)));
    }
    query
}

/// Build the evaluation listing query from the filter.
fn evaluations_query(filter: &EvaluationFilter) -> String {
    let mut params: Vec<String> = Vec::new();
    if let Some(limit) = filter.limit {
        params.push(format!("limit={limit}"));
    }
    if let Some(offset) = filter.offset {
        params.push(format!("offset={offset}"));
    }
    if let Some(agent) = &filter.agent_name {
        params.push(format!("agent_name={}", urlencoding::encode(agent)));
    }
    if let Some(hallucinated) = filter.hallucinated {
        params.push(format!("hallucinated={hallucinated}"));
    }
    if let Some(start) = &filter.start_date {
        params.push(format!("start_date={}", urlencoding::encode(start)));
    }
    if let Some(end) = &filter.end_date {
        params.push(format!("end_date={}", urlencoding::encode(end)));
    }

    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}

// ---------------------------------------------------------------------------
// Backend impl
// ---------------------------------------------------------------------------

impl Backend for FullBackend {
    fn login(&self, http: &Transport, email: &str, password: &str) -> Result<String> {
        let resp: TokenResponse =
            http.post_json("/auth/login", Auth::None, &LoginRequest { email, password })?;
        Ok(resp.access_token)
    }

    fn register(
        &self,
        http: &Transport,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<()> {
        // The endpoint answers 201 with the created user; the caller follows
        // up with a login, so the body is not needed here.
        let _: serde_json::Value = http.post_json(
            "/auth/register",
            Auth::None,
            &RegisterRequest {
                email,
                password,
                full_name,
            },
        )?;
        Ok(())
    }

    fn current_user(&self, http: &Transport, creds: &Creds) -> Result<User> {
        http.get_json("/auth/me", Auth::Bearer(creds.require_token()?))
    }

    fn create_api_key(&self, http: &Transport, creds: &Creds, name: &str) -> Result<ApiKeyRecord> {
        http.post_json(
            "/auth/api-keys",
            Auth::Bearer(creds.require_token()?),
            &KeyCreateRequest { name },
        )
    }

    fn list_api_keys(&self, http: &Transport, creds: &Creds) -> Result<Option<Vec<ApiKeyRecord>>> {
        let items: Vec<KeyListItem> =
            http.get_json("/auth/api-keys", Auth::Bearer(creds.require_token()?))?;
        Ok(Some(items.into_iter().map(ApiKeyRecord::from).collect()))
    }

    fn delete_api_key(&self, http: &Transport, creds: &Creds, id: &str) -> Result<()> {
        let path = format!("/auth/api-keys/{id}");
        match http.delete(&path, Auth::Bearer(creds.require_token()?)) {
            // Already gone server-side: the caller's intent is satisfied.
            Err(ApiError::Http { status: 404, .. }) => Ok(()),
            other => other,
        }
    }

    fn stats(
        &self,
        http: &Transport,
        creds: &Creds,
        days: u32,
        agent: Option<&str>,
    ) -> Result<EvaluationStats> {
        let path = format!("/evaluations/stats{}", stats_query(days, agent));
        http.get_json(&path, Auth::Bearer(creds.require_token()?))
    }

    fn list_evaluations(
        &self,
        http: &Transport,
        creds: &Creds,
        filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>> {
        let path = format!("/evaluations/{}", evaluations_query(filter));
        http.get_json(&path, Auth::Bearer(creds.require_token()?))
    }

    fn get_evaluation(&self, http: &Transport, creds: &Creds, id: &str) -> Result<Evaluation> {
        let path = format!("/evaluations/{id}");
        http.get_json(&path, Auth::ApiKey(creds.require_api_key()?))
    }

    fn delete_evaluation(&self, http: &Transport, creds: &Creds, id: &str) -> Result<()> {
        let path = format!("/evaluations/{id}");
        http.delete(&path, Auth::ApiKey(creds.require_api_key()?))
    }

    fn submit(&self, http: &Transport, creds: &Creds, report: &MetricReport) -> Result<String> {
        let resp: SubmitResponse = http.post_json(
            "/evaluations/",
            Auth::ApiKey(creds.require_api_key()?),
            report,
        )?;
        Ok(resp.id)
    }

    fn submit_batch(
        &self,
        http: &Transport,
        creds: &Creds,
        reports: &[MetricReport],
    ) -> Result<usize> {
        let resp: BatchResponse = http.post_json(
            "/evaluations/batch",
            Auth::ApiKey(creds.require_api_key()?),
            &BatchRequest {
                evaluations: reports,
            },
        )?;
        Ok(resp.count)
    }

    fn health(&self, http: &Transport) -> Result<HealthStatus> {
        http.get_json("/health", Auth::None)
    }
}
