/// HTTP transport for the backend adapter.
///
/// Wraps the synchronous `ureq` client with base-URL joining, credential
/// headers, timeouts, and error classification. The transport also owns the
/// read-retry policy: a read request is retried once after a transport
/// failure, mutating requests never are (a duplicated POST could double a
/// side effect; a duplicated GET cannot).
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{ApiError, Result};
use crate::config::schema::BackendConfig;

/// Credential attached to a single request.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    /// No credential (login, register, health).
    None,
    /// `Authorization: Bearer <token>` — session endpoints.
    Bearer(&'a str),
    /// `X-API-Key: <key>` — agent endpoints.
    ApiKey(&'a str),
}

/// Synchronous HTTP transport bound to one base URL.
#[derive(Debug, Clone)]
pub struct Transport {
    base_url: String,
    timeout: Duration,
    retry_reads: bool,
}

impl Transport {
    /// Build a transport from the resolved backend config.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            retry_reads: config.retry_reads,
        }
    }

    /// Join a path onto the base URL.
    ///
    /// On Windows, "localhost" may try IPv6 (::1) first, causing delays when
    /// the backend only binds to IPv4. Use 127.0.0.1 directly.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path).replace("://localhost", "://127.0.0.1")
    }

    /// GET `path` and decode the JSON response. Retried once on transport
    /// failure when the config allows it.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> Result<T> {
        let attempt = || {
            let req = apply_auth(ureq::get(&self.url(path)).timeout(self.timeout), auth);
            decode(req.call().map_err(classify)?)
        };

        match attempt() {
            Err(ApiError::Network(_)) if self.retry_reads => attempt(),
            result => result,
        }
    }

    /// POST a JSON body to `path` and decode the JSON response. Never
    /// retried.
    pub fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Auth,
        body: &impl Serialize,
    ) -> Result<T> {
        let req = apply_auth(ureq::post(&self.url(path)).timeout(self.timeout), auth);
        decode(req.send_json(body).map_err(classify)?)
    }

    /// DELETE `path`, discarding any response body. Never retried.
    pub fn delete(&self, path: &str, auth: Auth) -> Result<()> {
        let req = apply_auth(ureq::delete(&self.url(path)).timeout(self.timeout), auth);
        req.call().map_err(classify)?;
        Ok(())
    }
}

/// Attach the credential header, if any.
fn apply_auth(req: ureq::Request, auth: Auth) -> ureq::Request {
    match auth {
        Auth::None => req,
        Auth::Bearer(token) => req.set("Authorization", &format!("Bearer {token}")),
        Auth::ApiKey(key) => req.set("X-API-Key", key),
    }
}

/// Decode a 2xx response body.
fn decode<T: DeserializeOwned>(resp: ureq::Response) -> Result<T> {
    resp.into_json::<T>()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Classify a `ureq` error into the adapter taxonomy.
///
/// 401/403 become [`ApiError::Auth`]; other statuses become
/// [`ApiError::Http`] with the message extracted from the body; transport
/// failures become [`ApiError::Network`].
fn classify(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            let message = extract_message(&body)
                .unwrap_or_else(|| format!("request failed with status {status}"));
            match status {
                401 | 403 => ApiError::Auth(message),
                _ => ApiError::Http { status, message },
            }
        }
        ureq::Error::Transport(transport) => ApiError::Network(transport.to_string()),
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The backends answer with `{"detail": ...}`; `message` and `error` are
/// accepted too. A structured `detail` (e.g. a field-validation list) is
/// compacted to its JSON text.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in ["detail", "message", "error"] {
        match value.get(field) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(other) if !other.is_null() => return Some(other.to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_strips_trailing_slash() {
        let config = BackendConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..BackendConfig::default()
        };
        let transport = Transport::from_config(&config);
        assert_eq!(transport.base_url, "http://localhost:8000");
    }

    #[test]
    fn url_rewrites_localhost() {
        let transport = Transport::from_config(&BackendConfig::default());
        assert_eq!(
            transport.url("/health"),
            "http://127.0.0.1:8000/health"
        );
    }

    #[test]
    fn extract_message_prefers_detail() {
        assert_eq!(
            extract_message(r#"{"detail": "Incorrect email or password"}"#).as_deref(),
            Some("Incorrect email or password")
        );
        assert_eq!(
            extract_message(r#"{"message": "nope"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(
            extract_message(r#"{"error": "boom"}"#).as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn extract_message_compacts_structured_detail() {
        let msg = extract_message(r#"{"detail": [{"loc": ["body", "email"]}]}"#).unwrap();
        assert!(msg.contains("email"));
    }

    #[test]
    fn extract_message_handles_junk() {
        assert_eq!(extract_message("not json"), None);
        assert_eq!(extract_message("{}"), None);
        assert_eq!(extract_message(r#"{"detail": null}"#), None);
    }
}
