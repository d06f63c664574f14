/// Configuration schema and defaults for halo.
///
/// Defines the TOML-serializable configuration with two sections:
/// `[backend]` (where and how to reach the monitoring service) and
/// `[store]` (where credentials are persisted).
///
/// Every field has a built-in default. Users only set what they want to
/// override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level halo configuration.
///
/// Maps directly to the `~/.halo/config.toml` and `.halo.toml` file schemas.
/// All sections and fields are optional — missing values fall back to
/// built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HaloConfig {
    pub backend: BackendConfig,
    pub store: StoreConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Which backend contract the service speaks.
///
/// The two contracts are incompatible at the wire level, so the flavor is
/// explicit configuration — it is never guessed from response shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flavor {
    /// Multi-tenant service: JWT session auth, per-user API keys,
    /// evaluation listing and stats endpoints.
    #[default]
    Full,
    /// Single-agent MVP service: `/register`, `/metrics`, `/stats/{id}`,
    /// `/health`. No session auth, no server-side key listing.
    Minimal,
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Minimal => write!(f, "minimal"),
        }
    }
}

/// Connection settings for the monitoring service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL all requests are relative to.
    pub base_url: String,
    /// Backend contract flavor: `full` or `minimal`.
    pub flavor: Flavor,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
    /// Retry read requests once after a transport failure. Mutating
    /// requests are never retried.
    pub retry_reads: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            flavor: Flavor::default(),
            timeout_ms: 10_000,
            retry_reads: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [store]
// ---------------------------------------------------------------------------

/// Credential store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Override of the credential store directory (default: `~/.halo`).
    pub dir: Option<String>,
}

impl HaloConfig {
    /// The annotated default config written by `halo config init`.
    pub fn default_toml() -> &'static str {
        r#"# halo configuration
#
# Layering (later wins): built-in defaults, this file, ./.halo.toml,
# HALO_* environment variables.

[backend]
# Base URL of the monitoring service.
base_url = "http://localhost:8000"
# Backend contract flavor: "full" (multi-tenant) or "minimal" (single-agent).
flavor = "full"
# Per-request timeout in milliseconds.
timeout_ms = 10000
# Retry read requests once after a transport failure.
retry_reads = true

[store]
# Credential store directory. Defaults to ~/.halo when unset.
# dir = "/path/to/dir"
"#
    }
}
