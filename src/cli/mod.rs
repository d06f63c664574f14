//! CLI command implementations for halo.
//!
//! Provides subcommand handlers for:
//! - `halo login` / `register` / `logout` / `whoami` — session management
//! - `halo keys list|create|delete|use` — API key management
//! - `halo stats` — evaluation statistics over a time window
//! - `halo evals` — list recorded evaluations
//! - `halo submit` — submit metric reports from a JSON file or stdin
//! - `halo health` — backend liveness probe
//! - `halo config show|init|set|reset` — configuration management
//!
//! Handlers render with `colored` tables by default; most accept
//! `--format json` (and `csv` where tabular export makes sense).

use std::fs;
use std::io::Read;

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use crate::api::types::{ApiKeyRecord, Evaluation, EvaluationFilter, MetricReport};
use crate::api::{ApiError, Client};
use crate::config;
use crate::store::CredStore;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Client construction and error surfacing
// ---------------------------------------------------------------------------

/// Build the adapter from the resolved config and the default store.
fn build_client() -> Result<Client> {
    let config = config::load();
    let store = config::store_dir(&config)
        .map(CredStore::new)
        .context("could not determine home directory")?;
    Ok(Client::new(&config, store))
}

/// Turn an adapter error into a CLI error with a recovery hint. An auth
/// failure also clears the stale session token.
fn surface(client: &Client, err: ApiError) -> anyhow::Error {
    if err.is_auth() {
        client.store().clear_token();
        return anyhow!(
            "{err}\n{}",
            "Session cleared — run `halo login` to re-authenticate.".yellow()
        );
    }
    if err.is_retryable() {
        return anyhow!(
            "{err}\n{}",
            "The backend may be temporarily unreachable — retry in a moment.".yellow()
        );
    }
    anyhow!(err)
}

// ---------------------------------------------------------------------------
// halo login / register / logout / whoami
// ---------------------------------------------------------------------------

pub fn run_login(email: &str, password: &str) -> Result<()> {
    let client = build_client()?;
    let user = client
        .login(email, password)
        .map_err(|e| surface(&client, e))?;
    println!("{} {}", "Logged in as".green(), user.email.bold());
    Ok(())
}

pub fn run_register(
    email: &str,
    password: &str,
    confirmation: &str,
    full_name: Option<&str>,
) -> Result<()> {
    crate::api::validation::confirm_passwords(password, confirmation).map_err(|e| anyhow!(e))?;

    let client = build_client()?;
    let user = client
        .register(email, password, full_name)
        .map_err(|e| surface(&client, e))?;
    println!(
        "{} {}",
        "Account created — logged in as".green(),
        user.email.bold()
    );
    Ok(())
}

pub fn run_logout() -> Result<()> {
    let client = build_client()?;
    client.logout();
    println!("Logged out. Local credentials cleared.");
    Ok(())
}

/// Show the current identity. Falls back to the cached user object when the
/// backend is unreachable — stale identity beats no identity for a status
/// command.
pub fn run_whoami(format: OutputFormat) -> Result<()> {
    let client = build_client()?;

    let user = match client.current_user() {
        Ok(user) => user,
        Err(err @ (ApiError::Network(_) | ApiError::Http { .. })) => {
            match client.store().user() {
                Some(cached) => {
                    eprintln!(
                        "{}",
                        format!("warning: backend unreachable ({err}); showing cached identity")
                            .yellow()
                    );
                    cached
                }
                None => return Err(surface(&client, err)),
            }
        }
        Err(err) => return Err(surface(&client, err)),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        _ => {
            println!("{} {}", "Email:".bold(), user.email);
            if let Some(name) = &user.full_name {
                println!("{} {}", "Name: ".bold(), name);
            }
            println!("{} {}", "Id:   ".bold(), user.id);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// halo keys
// ---------------------------------------------------------------------------

pub fn run_keys_list(format: OutputFormat) -> Result<()> {
    let client = build_client()?;
    let keys = client.list_api_keys().map_err(|e| surface(&client, e))?;

    if keys.is_empty() {
        println!(
            "{}",
            "No API keys yet. Create one with `halo keys create <name>`.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&keys)?),
        OutputFormat::Csv => print_keys_csv(&keys),
        OutputFormat::Table => print_keys_table(&keys, client.active_key().as_deref()),
    }
    Ok(())
}

fn print_keys_table(keys: &[ApiKeyRecord], active: Option<&str>) {
    println!("{}", "API Keys".bold().cyan());
    println!(
        "  {:<24} {:<20} {:<28} {:<20} Active",
        "Id", "Name", "Key", "Created"
    );
    println!("  {}", "-".repeat(100));

    for key in keys {
        let marker = if active == Some(key.key.as_str()) {
            "*"
        } else if key.is_active {
            "yes"
        } else {
            "no"
        };
        println!(
            "  {:<24} {:<20} {:<28} {:<20} {}",
            truncate(&key.id, 24),
            truncate(&key.name, 20),
            truncate(&key.key, 28),
            truncate(&key.created_at, 20),
            marker,
        );
    }
    if active.is_some() {
        println!("\n  {} marks the active submission key", "*".bold());
    }
}

fn print_keys_csv(keys: &[ApiKeyRecord]) {
    println!("id,name,key,created_at,last_used_at,is_active");
    for key in keys {
        println!(
            "{},{},{},{},{},{}",
            key.id,
            key.name,
            key.key,
            key.created_at,
            key.last_used_at.as_deref().unwrap_or(""),
            key.is_active,
        );
    }
}

pub fn run_keys_create(name: &str) -> Result<()> {
    let client = build_client()?;
    let record = client.create_api_key(name).map_err(|e| surface(&client, e))?;

    println!("{} {}", "Created API key".green(), record.name.bold());
    println!("  {} {}", "Id: ".bold(), record.id);
    println!("  {} {}", "Key:".bold(), record.key);
    println!(
        "\n{}",
        "This is the only time the full key is shown. Store it securely."
            .yellow()
            .bold()
    );
    Ok(())
}

pub fn run_keys_delete(id: &str) -> Result<()> {
    let client = build_client()?;
    client.delete_api_key(id).map_err(|e| surface(&client, e))?;
    println!("Deleted API key {id}.");
    Ok(())
}

pub fn run_keys_use(key: &str) -> Result<()> {
    let client = build_client()?;
    client.set_active_key(key).map_err(|e| surface(&client, e))?;
    println!("Active submission key updated.");
    Ok(())
}

// ---------------------------------------------------------------------------
// halo stats
// ---------------------------------------------------------------------------

pub fn run_stats(days: u32, agent: Option<&str>, format: OutputFormat) -> Result<()> {
    let client = build_client()?;
    let stats = client
        .get_evaluation_stats(days, agent)
        .map_err(|e| surface(&client, e))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => {
            let window = match agent {
                Some(agent) => format!("last {days} days — agent '{agent}'"),
                None => format!("last {days} days"),
            };
            println!("{} ({window})", "Evaluation Stats".bold().cyan());
            println!("{}", "=".repeat(48));
            println!(
                "  {} {}",
                "Total evaluations:   ".bold(),
                stats.total_evaluations
            );
            println!(
                "  {} {}",
                "Total hallucinations:".bold(),
                stats.total_hallucinations
            );
            println!(
                "  {} {:.1}%",
                "Hallucination rate:  ".bold(),
                stats.hallucination_rate * 100.0
            );
            println!(
                "  {} {:.3}s",
                "Avg latency:         ".bold(),
                stats.avg_latency
            );
            println!(
                "  {} {:.2} q/s",
                "Avg throughput:      ".bold(),
                stats.avg_throughput
            );
            println!(
                "  {} {:.3}",
                "Avg semantic drift:  ".bold(),
                stats.avg_semantic_drift
            );
            println!(
                "  {} {:.3}",
                "Avg uncertainty:     ".bold(),
                stats.avg_uncertainty
            );
            println!(
                "  {} {:.3}",
                "Avg factual support: ".bold(),
                stats.avg_factual_support
            );

            if stats.total_evaluations == 0 {
                println!(
                    "\n{}",
                    "No evaluations in this window (or the backend was unreachable).".yellow()
                );
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// halo evals
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn run_evals(
    limit: Option<u32>,
    offset: Option<u32>,
    agent: Option<String>,
    hallucinated: Option<bool>,
    since: Option<String>,
    until: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let filter = EvaluationFilter {
        limit,
        offset,
        agent_name: agent,
        hallucinated,
        start_date: since,
        end_date: until,
    };

    let client = build_client()?;
    let evals = client
        .list_evaluations(&filter)
        .map_err(|e| surface(&client, e))?;

    if evals.is_empty() {
        println!("{}", "No evaluations recorded.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evals)?),
        OutputFormat::Csv => print_evals_csv(&evals),
        OutputFormat::Table => print_evals_table(&evals),
    }
    Ok(())
}

fn print_evals_table(evals: &[Evaluation]) {
    println!("{}", "Evaluations".bold().cyan());
    println!(
        "  {:<12} {:<20} {:<14} {:<6} {:>6} {:>9} Agent",
        "Id", "Created", "Mode", "Hall.", "Prob", "Latency"
    );
    println!("  {}", "-".repeat(82));

    for (i, eval) in evals.iter().enumerate() {
        let hallucinated = if eval.hallucinated { "yes" } else { "no" };
        let line = format!(
            "  {:<12} {:<20} {:<14} {:<6} {:>6.2} {:>8.3}s {}",
            truncate(&eval.id, 12),
            truncate(&eval.created_at, 20),
            truncate(&eval.mode, 14),
            hallucinated,
            eval.hallucination_probability,
            eval.latency_sec,
            eval.agent_name.as_deref().unwrap_or("-"),
        );

        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_evals_csv(evals: &[Evaluation]) {
    println!("id,created_at,mode,hallucinated,hallucination_probability,latency_sec,agent_name");
    for eval in evals {
        println!(
            "{},{},{},{},{},{},{}",
            eval.id,
            eval.created_at,
            eval.mode,
            eval.hallucinated,
            eval.hallucination_probability,
            eval.latency_sec,
            eval.agent_name.as_deref().unwrap_or(""),
        );
    }
}

// ---------------------------------------------------------------------------
// halo submit
// ---------------------------------------------------------------------------

/// Submit metric reports from a JSON file (`-` for stdin). A single object
/// submits one report; an array submits a batch.
pub fn run_submit(file: &str) -> Result<()> {
    let raw = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?
    };

    let client = build_client()?;

    if let Ok(report) = serde_json::from_str::<MetricReport>(&raw) {
        let id = client
            .submit_metric(&report)
            .map_err(|e| surface(&client, e))?;
        println!("{} {}", "Stored evaluation".green(), id);
        return Ok(());
    }

    let reports: Vec<MetricReport> = serde_json::from_str(&raw)
        .context("input is neither a metric report object nor an array of them")?;
    let count = client
        .submit_batch(&reports)
        .map_err(|e| surface(&client, e))?;
    println!("{} {count} evaluations", "Stored".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// halo health
// ---------------------------------------------------------------------------

pub fn run_health() -> Result<()> {
    let client = build_client()?;
    match client.health_check() {
        Ok(health) => {
            println!("{} {}", "Backend status:".bold(), health.status.green());
            if let Some(service) = &health.service {
                println!(
                    "{} {} {}",
                    "Service:       ".bold(),
                    service,
                    health.version.as_deref().unwrap_or("")
                );
            }
            if let Some(timestamp) = &health.timestamp {
                println!("{} {}", "Reported at:   ".bold(), timestamp);
            }
            Ok(())
        }
        Err(err) => Err(anyhow!("{} {err}", "Backend unhealthy:".red())),
    }
}

// ---------------------------------------------------------------------------
// halo config
// ---------------------------------------------------------------------------

pub fn run_config_show() -> Result<()> {
    print!("{}", config::show_effective_config()?);
    Ok(())
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("Set {key} = {value}");
    Ok(())
}

pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!("Reset config at {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Truncate a string for fixed-width table columns.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else if max <= 3 {
        s[..max].to_string()
    } else {
        format!("{}...", &s[..max - 3])
    }
}
