/// Configuration system for halo.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — hardcoded in [`schema::HaloConfig::default()`]
/// 2. **User global config** — `~/.halo/config.toml`
/// 3. **Project local config** — `.halo.toml` in the current working directory
/// 4. **Environment variables** — `HALO_*` overrides (highest precedence)
///
/// Later layers override earlier ones. A malformed file is silently ignored
/// and the previous layer's values stand — a broken config must never take
/// the CLI down with it.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::{Flavor, HaloConfig};

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved halo configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. This is the primary entry point for all modules that need
/// configuration.
pub fn load() -> HaloConfig {
    let mut config = HaloConfig::default();

    // Layer 2: user global config (~/.halo/config.toml)
    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    // Layer 3: project local config (.halo.toml)
    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed.
fn load_toml_file(path: Option<PathBuf>) -> Option<HaloConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.halo/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".halo").join("config.toml"))
}

/// Path to the project local config: `.halo.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".halo.toml"))
}

/// The credential store directory for the resolved config: the `[store]`
/// override when set, `~/.halo` otherwise.
pub fn store_dir(config: &HaloConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.store.dir
        && !dir.trim().is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(".halo"))
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `HALO_API_URL` — backend base URL
/// - `HALO_FLAVOR` — backend flavor (`full`, `minimal`)
/// - `HALO_TIMEOUT_MS` — per-request timeout
/// - `HALO_RETRY_READS` — retry reads once on transport failure (`1`/`true`)
/// - `HALO_STORE_DIR` — credential store directory
///
/// (`HALO_API_KEY` is not a config field — the adapter consults it directly
/// when attaching the `X-API-Key` header.)
fn apply_env_overrides(config: &mut HaloConfig) {
    if let Ok(val) = std::env::var("HALO_API_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("HALO_FLAVOR")
        && let Some(flavor) = parse_flavor(&val)
    {
        config.backend.flavor = flavor;
    }
    if let Ok(val) = std::env::var("HALO_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("HALO_RETRY_READS") {
        config.backend.retry_reads = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("HALO_STORE_DIR")
        && !val.is_empty()
    {
        config.store.dir = Some(val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a flavor string.
fn parse_flavor(val: &str) -> Option<Flavor> {
    match val.to_ascii_lowercase().as_str() {
        "full" => Some(Flavor::Full),
        "minimal" => Some(Flavor::Minimal),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.halo/config.toml`.
///
/// Creates the `~/.halo/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.halo/ directory")?;
    }

    fs::write(&path, HaloConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or the serialized defaults when no file
/// exists yet), updates the specified dotted key (`backend.base_url`,
/// `backend.flavor`, ...), and writes the result back.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let current = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&HaloConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&current).context("failed to parse config as TOML")?;
    set_toml_value(&mut root, key, value)?;

    // Reject updates that would leave an unloadable config behind.
    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    let _: HaloConfig =
        toml::from_str(&output).with_context(|| format!("'{value}' is not valid for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path, preserving the
/// type of the existing value.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (section, leaf) = key
        .rsplit_once('.')
        .with_context(|| format!("expected a dotted key like 'backend.base_url', got '{key}'"))?;

    let mut current = &mut *root;
    for part in section.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected a table at '{section}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        _ => toml::Value::String(raw_value.to_string()),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
