/// Integration tests for the backend adapter.
///
/// Unit tests for individual submodules live in each file's `#[cfg(test)]`
/// block. These tests exercise the adapter end-to-end against an in-process
/// mock backend (a `tiny_http` server with canned flavor-shaped responses)
/// and an isolated temp-dir credential store, covering the adapter's core
/// contracts:
///
/// - validation failures issue zero network requests
/// - stats normalization zero-fills whatever the backend omits
/// - degradation paths (no listing endpoint, unreachable backend)
/// - credential persistence (token, user cache, key cache round trips)
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;
use tiny_http::{Header, Response, Server};

use halo::api::types::{EvaluationFilter, EvaluationStats, MetricReport};
use halo::api::{ApiError, Client};
use halo::config::schema::{BackendConfig, Flavor, HaloConfig, StoreConfig};
use halo::store::CredStore;

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// One observed request, as recorded by the mock backend.
#[derive(Debug, Clone)]
struct Observed {
    method: String,
    url: String,
    authorization: Option<String>,
    api_key: Option<String>,
}

/// In-process HTTP backend serving canned responses on an ephemeral port.
struct MockBackend {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Observed>>>,
    _server: Arc<Server>,
}

impl MockBackend {
    fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn observed(&self) -> Vec<Observed> {
        self.requests.lock().unwrap().clone()
    }
}

/// Spawn a mock backend. The handler receives each observed request plus
/// its body and returns `(status, json_body)`. The listener thread runs
/// until the test binary exits.
fn spawn_backend<F>(handler: F) -> MockBackend
where
    F: Fn(&Observed, &str) -> (u16, String) + Send + Sync + 'static,
{
    let server = Arc::new(Server::http("127.0.0.1:0").expect("failed to bind mock backend"));
    let addr = server
        .server_addr()
        .to_ip()
        .expect("mock backend has an IP listener");
    let hits = Arc::new(AtomicUsize::new(0));
    let requests: Arc<Mutex<Vec<Observed>>> = Arc::new(Mutex::new(Vec::new()));

    {
        let server = Arc::clone(&server);
        let hits = Arc::clone(&hits);
        let requests = Arc::clone(&requests);
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                hits.fetch_add(1, Ordering::SeqCst);

                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv(name))
                        .map(|h| h.value.to_string())
                };
                let observed = Observed {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization: header("Authorization"),
                    api_key: header("X-API-Key"),
                };
                requests.lock().unwrap().push(observed.clone());

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);

                let (status, payload) = handler(&observed, &body);
                let response = Response::from_string(payload)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .unwrap(),
                    );
                let _ = request.respond(response);
            }
        });
    }

    MockBackend {
        base_url: format!("http://{addr}"),
        hits,
        requests,
        _server: server,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A client wired to the given base URL with an isolated temp-dir store.
/// The temp dir must outlive the client.
fn client_for(flavor: Flavor, base_url: &str, dir: &TempDir) -> Client {
    let config = HaloConfig {
        backend: BackendConfig {
            base_url: base_url.to_string(),
            flavor,
            timeout_ms: 2_000,
            retry_reads: true,
        },
        store: StoreConfig::default(),
    };
    Client::new(&config, CredStore::new(dir.path().join("halo")))
}

fn sample_report() -> MetricReport {
    MetricReport {
        prompt: "What is AI?".into(),
        response: "AI is artificial intelligence.".into(),
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
        agent_name: None,
        session_id: None,
    }
}

// ---------------------------------------------------------------------------
// Validation gates — no request leaves the process
// ---------------------------------------------------------------------------

#[test]
fn blank_key_name_is_rejected_without_a_request() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);

    for name in ["", "   ", "\t\n"] {
        let err = client.create_api_key(name).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)), "got {err:?}");
    }
    assert_eq!(backend.hit_count(), 0);
}

#[test]
fn invalid_metric_report_is_rejected_without_a_request() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);
    client.set_active_key("halo_key").unwrap();

    let mut report = sample_report();
    report.prompt = String::new();
    assert!(matches!(
        client.submit_metric(&report).unwrap_err(),
        ApiError::Validation(_)
    ));

    let mut report = sample_report();
    report.hallucination_probability = 2.0;
    assert!(matches!(
        client.submit_metric(&report).unwrap_err(),
        ApiError::Validation(_)
    ));

    assert_eq!(backend.hit_count(), 0);
}

#[test]
fn malformed_email_is_rejected_without_a_request() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);

    assert!(matches!(
        client.login("not-an-email", "secret").unwrap_err(),
        ApiError::Validation(_)
    ));
    assert!(matches!(
        client.register("user@nodot", "longenough", None).unwrap_err(),
        ApiError::Validation(_)
    ));
    assert!(matches!(
        client.register("user@example.com", "short", None).unwrap_err(),
        ApiError::Validation(_)
    ));
    assert_eq!(backend.hit_count(), 0);
}

// ---------------------------------------------------------------------------
// Login scenario
// ---------------------------------------------------------------------------

#[test]
fn login_persists_token_and_resolves_user() {
    let backend = spawn_backend(|req, _body| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/auth/login") => (200, r#"{"access_token":"abc","token_type":"bearer","expires_in":1800}"#.into()),
        ("GET", "/auth/me") => (
            200,
            r#"{"id":"u1","email":"user@example.com","full_name":"Test User","is_active":true,"created_at":"2026-08-01T00:00:00Z"}"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);

    let user = client.login("user@example.com", "secret").unwrap();
    assert_eq!(user.email, "user@example.com");

    // Token persisted; identity cached for offline fallback.
    assert_eq!(client.store().token().as_deref(), Some("abc"));
    assert_eq!(
        client.store().user().map(|u| u.email).as_deref(),
        Some("user@example.com")
    );

    // The follow-up identity fetch carried the fresh token.
    let me = backend
        .observed()
        .into_iter()
        .find(|r| r.url == "/auth/me")
        .unwrap();
    assert_eq!(me.authorization.as_deref(), Some("Bearer abc"));
}

#[test]
fn failed_login_surfaces_server_message_as_auth_error() {
    let backend = spawn_backend(|_, _| (401, r#"{"detail":"Incorrect email or password"}"#.into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);

    match client.login("user@example.com", "wrong").unwrap_err() {
        ApiError::Auth(message) => assert_eq!(message, "Incorrect email or password"),
        other => panic!("expected Auth, got {other:?}"),
    }
    assert!(client.store().token().is_none());
}

#[test]
fn login_is_unsupported_on_the_minimal_flavor() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    assert!(matches!(
        client.login("user@example.com", "secret").unwrap_err(),
        ApiError::Unsupported(_)
    ));
    assert_eq!(backend.hit_count(), 0);
}

// ---------------------------------------------------------------------------
// Stats normalization and degradation
// ---------------------------------------------------------------------------

#[test]
fn stats_zero_fill_fields_the_backend_omits() {
    let backend = spawn_backend(|req, _| {
        assert!(req.url.starts_with("/evaluations/stats"));
        (200, r#"{"total_evaluations":5,"hallucination_rate":0.2}"#.into())
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("tok").unwrap();

    let stats = client.get_evaluation_stats(7, None).unwrap();
    assert_eq!(stats.total_evaluations, 5);
    assert_eq!(stats.hallucination_rate, 0.2);
    assert_eq!(stats.total_hallucinations, 0);
    assert_eq!(stats.avg_latency, 0.0);
    assert_eq!(stats.avg_throughput, 0.0);
    assert_eq!(stats.avg_semantic_drift, 0.0);
    assert_eq!(stats.avg_uncertainty, 0.0);
    assert_eq!(stats.avg_factual_support, 0.0);
}

#[test]
fn stats_for_an_empty_window_are_all_zero() {
    let backend = spawn_backend(|req, _| {
        assert!(req.url.contains("days=7"));
        (
            200,
            r#"{"total_evaluations":0,"total_hallucinations":0,"hallucination_rate":0.0,"avg_latency":0.0,"avg_throughput":0.0,"avg_semantic_drift":0.0,"avg_uncertainty":0.0,"avg_factual_support":0.0}"#.into(),
        )
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("tok").unwrap();

    let stats = client.get_evaluation_stats(7, None).unwrap();
    assert_eq!(stats, EvaluationStats::default());
}

#[test]
fn unreachable_backend_degrades_stats_to_the_zero_default() {
    // Nothing listens on port 9; the connection is refused immediately.
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, "http://127.0.0.1:9", &dir);
    client.store().set_token("tok").unwrap();

    let stats = client.get_evaluation_stats(7, None).unwrap();
    assert_eq!(stats, EvaluationStats::default());
}

#[test]
fn stats_auth_failures_still_propagate() {
    let backend = spawn_backend(|_, _| (401, r#"{"detail":"token expired"}"#.into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("stale").unwrap();

    assert!(matches!(
        client.get_evaluation_stats(7, None).unwrap_err(),
        ApiError::Auth(_)
    ));
}

#[test]
fn minimal_stats_normalize_field_names_via_the_cached_agent() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/register") => (
            200,
            r#"{"agent_id":"agent-1","api_key":"halo_abc","message":"Agent 'qa_bot' created successfully"}"#.into(),
        ),
        ("GET", "/stats/agent-1") => (
            200,
            r#"{"agent_id":"agent-1","total_evals":12,"total_hallucinations":3,"avg_hallucination_prob":0.25,"avg_latency":1.5,"avg_throughput":0.8}"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    // Creating the key caches the agent record and selects the key.
    client.create_api_key("qa_bot").unwrap();

    let stats = client.get_evaluation_stats(7, None).unwrap();
    assert_eq!(stats.total_evaluations, 12);
    assert_eq!(stats.total_hallucinations, 3);
    assert_eq!(stats.hallucination_rate, 0.25);
    assert_eq!(stats.avg_latency, 1.5);
    assert_eq!(stats.avg_semantic_drift, 0.0);

    let stats_req = backend
        .observed()
        .into_iter()
        .find(|r| r.url == "/stats/agent-1")
        .unwrap();
    assert_eq!(stats_req.api_key.as_deref(), Some("halo_abc"));
}

// ---------------------------------------------------------------------------
// Key lifecycle
// ---------------------------------------------------------------------------

#[test]
fn created_key_appears_in_the_next_listing() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/register") => (
            200,
            r#"{"agent_id":"agent-1","api_key":"halo_abc","message":"ok"}"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    let created = client.create_api_key("qa_bot").unwrap();
    assert_eq!(created.key, "halo_abc");
    assert!(!created.created_at.is_empty());

    // The listing is served entirely from the client-side cache — no
    // additional request may be issued for it.
    let hits_after_create = backend.hit_count();
    let listed = client.list_api_keys().unwrap();
    assert_eq!(backend.hit_count(), hits_after_create);

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "agent-1");
    assert_eq!(listed[0].key, "halo_abc");

    // The first created key becomes the active submission key.
    assert_eq!(client.store().active_key().as_deref(), Some("halo_abc"));
}

#[test]
fn listing_without_a_server_endpoint_returns_empty_not_an_error() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    let keys = client.list_api_keys().unwrap();
    assert!(keys.is_empty());
    assert_eq!(backend.hit_count(), 0);
}

#[test]
fn full_flavor_listing_refreshes_the_cache_with_previews() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("GET", "/auth/api-keys") => (
            200,
            r#"[{"id":"k1","name":"prod","key_preview":"agops_ab...xyz","created_at":"2026-08-01T00:00:00Z","last_used_at":null,"is_active":true}]"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("tok").unwrap();

    let keys = client.list_api_keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key, "agops_ab...xyz");

    // Cache refreshed from the server listing.
    assert_eq!(client.store().api_keys().len(), 1);
}

#[test]
fn deleting_a_key_twice_succeeds() {
    let deletes = Arc::new(AtomicUsize::new(0));
    let deletes_seen = Arc::clone(&deletes);
    let backend = spawn_backend(move |req, _| {
        if req.method == "DELETE" && req.url == "/auth/api-keys/k1" {
            if deletes_seen.fetch_add(1, Ordering::SeqCst) == 0 {
                (204, String::new())
            } else {
                (404, r#"{"detail":"API key not found"}"#.into())
            }
        } else {
            (404, r#"{"detail":"not found"}"#.into())
        }
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("tok").unwrap();

    client.delete_api_key("k1").unwrap();
    // Second delete: the backend answers 404, the caller still succeeds.
    client.delete_api_key("k1").unwrap();
    assert_eq!(deletes.load(Ordering::SeqCst), 2);
}

#[test]
fn deleting_the_active_key_clears_the_selection() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/register") => (
            200,
            r#"{"agent_id":"agent-1","api_key":"halo_abc","message":"ok"}"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    client.create_api_key("qa_bot").unwrap();
    assert!(client.store().active_key().is_some());

    client.delete_api_key("agent-1").unwrap();
    assert!(client.store().active_key().is_none());
    assert!(client.list_api_keys().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Metric submission
// ---------------------------------------------------------------------------

#[test]
fn submit_requires_an_api_key_before_any_request() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    assert!(matches!(
        client.submit_metric(&sample_report()).unwrap_err(),
        ApiError::Auth(_)
    ));
    assert_eq!(backend.hit_count(), 0);
}

#[test]
fn submit_sends_the_key_and_returns_the_evaluation_id() {
    let backend = spawn_backend(|req, body| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/metrics") => {
            // The minimal contract takes `model`, not `model_name`.
            let payload: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(payload["model"], "gpt-4o-mini");
            assert!(payload.get("model_name").is_none());
            (200, r#"{"status":"ok","eval_id":"e42","agent_id":"agent-1"}"#.into())
        }
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);
    client.set_active_key("halo_abc").unwrap();

    let id = client.submit_metric(&sample_report()).unwrap();
    assert_eq!(id, "e42");

    let submit = backend
        .observed()
        .into_iter()
        .find(|r| r.url == "/metrics")
        .unwrap();
    assert_eq!(submit.api_key.as_deref(), Some("halo_abc"));
}

#[test]
fn full_flavor_submit_posts_to_the_evaluations_endpoint() {
    let backend = spawn_backend(|req, body| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/evaluations/") => {
            let payload: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(payload["model_name"], "gpt-4o-mini");
            assert_eq!(payload["mode"], "self-check");
            (201, r#"{"id":"e7","status":"created","message":"Evaluation stored successfully"}"#.into())
        }
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.set_active_key("agops_key").unwrap();

    let id = client.submit_metric(&sample_report()).unwrap();
    assert_eq!(id, "e7");
}

#[test]
fn batch_submission_is_unsupported_on_the_minimal_flavor() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);
    client.set_active_key("halo_abc").unwrap();

    assert!(matches!(
        client.submit_batch(&[sample_report()]).unwrap_err(),
        ApiError::Unsupported(_)
    ));
    assert_eq!(backend.hit_count(), 0);
}

// ---------------------------------------------------------------------------
// Evaluations listing
// ---------------------------------------------------------------------------

#[test]
fn listing_evaluations_passes_filters_and_decodes_rows() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("GET", url) if url.starts_with("/evaluations/") => {
            assert!(url.contains("limit=10"));
            assert!(url.contains("agent_name=qa_bot"));
            (
                200,
                r#"[{"id":"e1","user_id":"u1","prompt":"q","response":"a","semantic_drift":0.1,"uncertainty":0.0,"factual_support":0.9,"hallucination_probability":0.05,"hallucinated":false,"latency_sec":0.4,"mode":"self-check","agent_name":"qa_bot","created_at":"2026-08-05T12:00:00Z"}]"#.into(),
            )
        }
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    client.store().set_token("tok").unwrap();

    let filter = EvaluationFilter {
        limit: Some(10),
        agent_name: Some("qa_bot".into()),
        ..EvaluationFilter::default()
    };
    let evals = client.list_evaluations(&filter).unwrap();
    assert_eq!(evals.len(), 1);
    assert_eq!(evals[0].id, "e1");
    assert!(!evals[0].hallucinated);
}

#[test]
fn listing_evaluations_on_the_minimal_flavor_is_empty_not_an_error() {
    let backend = spawn_backend(|_, _| (500, "{}".into()));
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    let evals = client.list_evaluations(&EvaluationFilter::default()).unwrap();
    assert!(evals.is_empty());
    assert_eq!(backend.hit_count(), 0);
}

// ---------------------------------------------------------------------------
// Health and logout
// ---------------------------------------------------------------------------

#[test]
fn health_check_decodes_both_flavor_payloads() {
    let backend = spawn_backend(|_, _| {
        (
            200,
            r#"{"status":"healthy","timestamp":"2026-08-07T00:00:00Z","service":"agentops-api","version":"0.1.0"}"#.into(),
        )
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, &backend.base_url, &dir);
    let health = client.health_check().unwrap();
    assert_eq!(health.status, "healthy");

    let backend = spawn_backend(|_, _| (200, r#"{"status":"ok","timestamp":"t"}"#.into()));
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);
    let health = client.health_check().unwrap();
    assert_eq!(health.status, "ok");
}

#[test]
fn health_check_propagates_failure() {
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Full, "http://127.0.0.1:9", &dir);
    assert!(matches!(
        client.health_check().unwrap_err(),
        ApiError::Network(_)
    ));
}

#[test]
fn logout_clears_every_persisted_entry_and_never_fails() {
    let backend = spawn_backend(|req, _| match (req.method.as_str(), req.url.as_str()) {
        ("POST", "/register") => (
            200,
            r#"{"agent_id":"agent-1","api_key":"halo_abc","message":"ok"}"#.into(),
        ),
        _ => (404, r#"{"detail":"not found"}"#.into()),
    });
    let dir = TempDir::new().unwrap();
    let client = client_for(Flavor::Minimal, &backend.base_url, &dir);

    client.store().set_token("tok").unwrap();
    client.create_api_key("qa_bot").unwrap();

    client.logout();
    assert!(client.store().token().is_none());
    assert!(client.store().user().is_none());
    assert!(client.store().api_keys().is_empty());
    assert!(client.store().active_key().is_none());

    // Logging out twice is just as fine.
    client.logout();
}
