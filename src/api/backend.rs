/// The flavor seam: one trait, one implementation per backend contract.
///
/// A [`Backend`] owns everything wire-specific — endpoint paths, request
/// shapes, response mapping. Everything flavor-independent (input
/// validation, credential persistence, the read retry, degradation
/// defaults) lives in [`Client`](super::Client), so adding a third backend
/// contract means writing one more impl of this trait and nothing else.
use super::error::{ApiError, Result};
use super::http::Transport;
use super::types::{
    ApiKeyRecord, Evaluation, EvaluationFilter, EvaluationStats, HealthStatus, MetricReport, User,
};

/// Credentials resolved by the client for one call.
///
/// The backend reads what it needs: session endpoints take the bearer
/// token, agent endpoints take the API key, and the minimal flavor resolves
/// its agent id from the cached key collection.
#[derive(Debug, Default)]
pub(crate) struct Creds {
    pub token: Option<String>,
    pub api_key: Option<String>,
    pub cached_keys: Vec<ApiKeyRecord>,
}

impl Creds {
    /// The bearer token, or an auth error telling the caller to log in.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ApiError::Auth("no active session (not logged in)".into()))
    }

    /// The active API key, or an auth error telling the caller to select one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::Auth("no active API key configured".into()))
    }
}

/// Wire-level operations of one backend contract.
pub(crate) trait Backend {
    /// Exchange credentials for a bearer token.
    fn login(&self, http: &Transport, email: &str, password: &str) -> Result<String>;

    /// Create a user account.
    fn register(
        &self,
        http: &Transport,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<()>;

    /// Fetch the identity behind the session token.
    fn current_user(&self, http: &Transport, creds: &Creds) -> Result<User>;

    /// Create an API key. The returned record carries the full secret —
    /// the only time it is ever disclosed.
    fn create_api_key(&self, http: &Transport, creds: &Creds, name: &str) -> Result<ApiKeyRecord>;

    /// Server-side key listing. `Ok(None)` means the contract has no such
    /// endpoint and the caller should degrade to its cached collection.
    fn list_api_keys(&self, http: &Transport, creds: &Creds) -> Result<Option<Vec<ApiKeyRecord>>>;

    /// Server-side key deletion. A flavor without the endpoint treats this
    /// as a local-only removal and returns `Ok`.
    fn delete_api_key(&self, http: &Transport, creds: &Creds, id: &str) -> Result<()>;

    /// Aggregate stats over the trailing `days` window, optionally filtered
    /// to one agent. Field names are normalized to [`EvaluationStats`];
    /// anything the contract does not report comes back as zero.
    fn stats(
        &self,
        http: &Transport,
        creds: &Creds,
        days: u32,
        agent: Option<&str>,
    ) -> Result<EvaluationStats>;

    /// List evaluations. A flavor without the endpoint returns an empty
    /// sequence — that is the degradation contract, not an error.
    fn list_evaluations(
        &self,
        http: &Transport,
        creds: &Creds,
        filter: &EvaluationFilter,
    ) -> Result<Vec<Evaluation>>;

    /// Fetch one evaluation by id.
    fn get_evaluation(&self, http: &Transport, creds: &Creds, id: &str) -> Result<Evaluation>;

    /// Delete one evaluation by id.
    fn delete_evaluation(&self, http: &Transport, creds: &Creds, id: &str) -> Result<()>;

    /// Submit one metric report; returns the stored evaluation id.
    fn submit(&self, http: &Transport, creds: &Creds, report: &MetricReport) -> Result<String>;

    /// Submit a batch of reports; returns how many were stored.
    fn submit_batch(
        &self,
        http: &Transport,
        creds: &Creds,
        reports: &[MetricReport],
    ) -> Result<usize>;

    /// Liveness probe.
    fn health(&self, http: &Transport) -> Result<HealthStatus>;
}
