/// Backend adapter for the hallucination-detection monitoring service.
///
/// Presents one stable operation set to callers regardless of which of the
/// two incompatible backend contracts is configured. The pieces:
///
/// - [`Client`] — the adapter: validates input, attaches credentials from
///   the injected store, dispatches to the configured flavor, and applies
///   the degradation contracts (cached key listings, all-zero stats on an
///   unreachable backend).
/// - [`backend::Backend`] — the flavor seam; `full` and `minimal` each own
///   their endpoints and response mappers.
/// - [`error::ApiError`] — the failure taxonomy every operation reports.
///
/// The client is stateless per call except for the credentials it reads
/// from the store on every request; concurrent calls from separate clients
/// against the same base URL are independent.
pub mod error;
pub mod types;
pub mod validation;

mod backend;
mod full;
mod http;
mod minimal;

pub use error::{ApiError, Result};

use backend::{Backend, Creds};
use full::FullBackend;
use http::Transport;
use minimal::MinimalBackend;
use types::{
    ApiKeyRecord, Evaluation, EvaluationFilter, EvaluationStats, HealthStatus, MetricReport, User,
};

use crate::config::schema::{Flavor, HaloConfig};
use crate::store::CredStore;

/// Environment override for the active API key, consulted before the
/// credential store. Lets agents submit metrics without a key file.
const API_KEY_ENV: &str = "HALO_API_KEY";

/// The backend adapter.
pub struct Client {
    http: Transport,
    backend: Box<dyn Backend + Send + Sync>,
    store: CredStore,
}

impl Client {
    /// Build a client for the configured flavor, with credentials read from
    /// and persisted to the given store.
    pub fn new(config: &HaloConfig, store: CredStore) -> Self {
        let backend: Box<dyn Backend + Send + Sync> = match config.backend.flavor {
            Flavor::Full => Box::new(FullBackend),
            Flavor::Minimal => Box::new(MinimalBackend),
        };
        Self {
            http: Transport::from_config(&config.backend),
            backend,
            store,
        }
    }

    /// The credential store this client reads and writes.
    pub fn store(&self) -> &CredStore {
        &self.store
    }

    /// Resolve the credentials for one call: session token and key cache
    /// from the store, API key from the environment override or the store's
    /// active-key entry.
    fn creds(&self) -> Creds {
        let env_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Creds {
            token: self.store.token(),
            api_key: env_key.or_else(|| self.store.active_key()),
            cached_keys: self.store.api_keys(),
        }
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Log in and persist the session: exchanges credentials for a bearer
    /// token, stores it, then fetches and caches the user identity.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        validation::email_shape(email)?;
        if password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }

        let token = self.backend.login(&self.http, email, password)?;
        self.store
            .set_token(&token)
            .map_err(|e| ApiError::Store(e.to_string()))?;

        let user = self.backend.current_user(&self.http, &self.creds())?;
        // Cache write is best-effort; the login itself already succeeded.
        let _ = self.store.set_user(&user);
        Ok(user)
    }

    /// Register a new account, then log in with the same credentials to
    /// establish the session.
    pub fn register(&self, email: &str, password: &str, full_name: Option<&str>) -> Result<User> {
        validation::email_shape(email)?;
        validation::password_strength(password)?;

        self.backend
            .register(&self.http, email, password, full_name)?;
        self.login(email, password)
    }

    /// Clear every locally persisted credential and cache entry.
    /// Local-only and best-effort: never fails.
    pub fn logout(&self) {
        self.store.clear_session();
    }

    /// Fetch the identity behind the current session, refreshing the cache.
    pub fn current_user(&self) -> Result<User> {
        let user = self.backend.current_user(&self.http, &self.creds())?;
        let _ = self.store.set_user(&user);
        Ok(user)
    }

    // -----------------------------------------------------------------------
    // API keys
    // -----------------------------------------------------------------------

    /// List API keys: the server's listing where the flavor has one (the
    /// cache is refreshed from it), the cached collection otherwise. A
    /// flavor without a listing endpoint yields the cache, not an error.
    pub fn list_api_keys(&self) -> Result<Vec<ApiKeyRecord>> {
        match self.backend.list_api_keys(&self.http, &self.creds())? {
            Some(keys) => {
                let _ = self.store.set_api_keys(&keys);
                Ok(keys)
            }
            None => Ok(self.store.api_keys()),
        }
    }

    /// Create an API key. The returned record carries the full secret —
    /// the only time it is disclosed.
    ///
    /// The record is appended to the cached collection so the very next
    /// [`list_api_keys`](Self::list_api_keys) sees it (the minimal flavor's
    /// listing reads nothing else). The first created key also becomes the
    /// active submission key when none is selected yet.
    pub fn create_api_key(&self, name: &str) -> Result<ApiKeyRecord> {
        validation::key_name(name)?;

        let record = self
            .backend
            .create_api_key(&self.http, &self.creds(), name.trim())?;
        self.store
            .append_api_key(&record)
            .map_err(|e| ApiError::Store(e.to_string()))?;
        if self.store.active_key().is_none() {
            let _ = self.store.set_active_key(&record.key);
        }
        Ok(record)
    }

    /// Delete an API key server-side (where the flavor supports it) and
    /// from the cached collection. Idempotent from the caller's
    /// perspective: deleting an id that is already gone succeeds.
    pub fn delete_api_key(&self, id: &str) -> Result<()> {
        self.backend.delete_api_key(&self.http, &self.creds(), id)?;

        let deleted_key = self
            .store
            .api_keys()
            .into_iter()
            .find(|record| record.id == id)
            .map(|record| record.key);
        let _ = self.store.remove_api_key(id);

        // The active selection must never point at a deleted record.
        if let (Some(deleted), Some(active)) = (deleted_key, self.store.active_key())
            && deleted == active
        {
            self.store.clear_active_key();
        }
        Ok(())
    }

    /// Select the API key attached to metric submissions.
    pub fn set_active_key(&self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(ApiError::Validation("API key must not be empty".into()));
        }
        self.store
            .set_active_key(key.trim())
            .map_err(|e| ApiError::Store(e.to_string()))
    }

    /// The API key metric submissions will use: the `HALO_API_KEY`
    /// environment override when set, the store's active-key entry
    /// otherwise.
    pub fn active_key(&self) -> Option<String> {
        self.creds().api_key
    }

    // -----------------------------------------------------------------------
    // Evaluations
    // -----------------------------------------------------------------------

    /// Aggregate stats over the trailing `days` window. Every numeric field
    /// of the result is finite — absent fields are zero. An unreachable
    /// backend yields the all-zero default rather than an error, so stats
    /// panels always render; auth failures still propagate (the caller must
    /// notice an expired session).
    pub fn get_evaluation_stats(&self, days: u32, agent: Option<&str>) -> Result<EvaluationStats> {
        match self.backend.stats(&self.http, &self.creds(), days, agent) {
            Err(ApiError::Network(_)) => Ok(EvaluationStats::default()),
            result => result,
        }
    }

    /// List evaluations matching the filter. Legitimately empty when the
    /// configured flavor has no listing endpoint.
    pub fn list_evaluations(&self, filter: &EvaluationFilter) -> Result<Vec<Evaluation>> {
        self.backend
            .list_evaluations(&self.http, &self.creds(), filter)
    }

    /// Fetch one evaluation by id.
    pub fn get_evaluation(&self, id: &str) -> Result<Evaluation> {
        self.backend.get_evaluation(&self.http, &self.creds(), id)
    }

    /// Delete one evaluation by id.
    pub fn delete_evaluation(&self, id: &str) -> Result<()> {
        self.backend
            .delete_evaluation(&self.http, &self.creds(), id)
    }

    /// Submit one metric report; returns the stored evaluation id. The
    /// report is validated before any request is sent, and the request is
    /// never retried.
    pub fn submit_metric(&self, report: &MetricReport) -> Result<String> {
        validation::metric_report(report)?;
        self.backend.submit(&self.http, &self.creds(), report)
    }

    /// Submit a batch of reports; returns how many were stored. Every
    /// report is validated before any request is sent.
    pub fn submit_batch(&self, reports: &[MetricReport]) -> Result<usize> {
        if reports.is_empty() {
            return Err(ApiError::Validation("batch must not be empty".into()));
        }
        for report in reports {
            validation::metric_report(report)?;
        }
        self.backend.submit_batch(&self.http, &self.creds(), reports)
    }

    // -----------------------------------------------------------------------
    // Health
    // -----------------------------------------------------------------------

    /// Liveness probe. Failures propagate as-is — the point of the probe is
    /// to see them.
    pub fn health_check(&self) -> Result<HealthStatus> {
        self.backend.health(&self.http)
    }
}
