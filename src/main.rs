use anyhow::Result;
use clap::{Parser, Subcommand};

use halo::cli::{self, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "halo")]
#[command(about = "CLI client for a hallucination-detection monitoring service")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Log in and persist the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Repeat the password to confirm it
        #[arg(long)]
        confirm: String,
        /// Optional display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Clear all locally persisted credentials
    Logout,
    /// Show the current identity
    Whoami {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },
    /// Show evaluation statistics over a time window
    Stats {
        /// Number of days to include
        #[arg(long, default_value = "7")]
        days: u32,
        /// Only include evaluations from this agent
        #[arg(long)]
        agent: Option<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List recorded evaluations
    Evals {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// Only include evaluations from this agent
        #[arg(long)]
        agent: Option<String>,
        /// Only hallucinated (true) or clean (false) evaluations
        #[arg(long)]
        hallucinated: Option<bool>,
        /// RFC 3339 lower bound on creation time
        #[arg(long)]
        since: Option<String>,
        /// RFC 3339 upper bound on creation time
        #[arg(long)]
        until: Option<String>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Submit metric reports from a JSON file ("-" for stdin)
    Submit {
        /// Path to a report object or an array of them
        #[arg(long)]
        file: String,
    },
    /// Check backend liveness
    Health,
    /// Manage halo configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum KeysCommand {
    /// List API keys
    List {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Create an API key (the full key is shown exactly once)
    Create {
        /// Friendly name for the key
        name: String,
    },
    /// Delete an API key by id
    Delete { id: String },
    /// Select the key attached to metric submissions
    Use { key: String },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Show the effective (fully resolved) configuration
    Show,
    /// Write the default annotated config to ~/.halo/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a single config key (dotted, e.g. backend.base_url)
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Login { email, password } => cli::run_login(&email, &password),
        Commands::Register {
            email,
            password,
            confirm,
            name,
        } => cli::run_register(&email, &password, &confirm, name.as_deref()),
        Commands::Logout => cli::run_logout(),
        Commands::Whoami { format } => {
            cli::run_whoami(OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Keys { command } => match command {
            KeysCommand::List { format } => {
                cli::run_keys_list(OutputFormat::from_str_opt(Some(&format)))
            }
            KeysCommand::Create { name } => cli::run_keys_create(&name),
            KeysCommand::Delete { id } => cli::run_keys_delete(&id),
            KeysCommand::Use { key } => cli::run_keys_use(&key),
        },
        Commands::Stats {
            days,
            agent,
            format,
        } => cli::run_stats(days, agent.as_deref(), OutputFormat::from_str_opt(Some(&format))),
        Commands::Evals {
            limit,
            offset,
            agent,
            hallucinated,
            since,
            until,
            format,
        } => cli::run_evals(
            limit,
            offset,
            agent,
            hallucinated,
            since,
            until,
            OutputFormat::from_str_opt(Some(&format)),
        ),
        Commands::Submit { file } => cli::run_submit(&file),
        Commands::Health => cli::run_health(),
        Commands::Config { command } => match command {
            ConfigCommand::Show => cli::run_config_show(),
            ConfigCommand::Init { force } => cli::run_config_init(force),
            ConfigCommand::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigCommand::Reset => cli::run_config_reset(),
        },
    }
}
