use crate::domain::model::ConflictPolicy;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "desa-bridge")]
#[command(about = "API proxy that forwards portal requests to the village backend services")]
pub struct ProxyCli {
    /// Path to a TOML proxy configuration (defaults to environment variables)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Listen address, overrides the config file
    #[arg(long, env = "PROXY_BIND")]
    pub bind: Option<String>,

    /// Main backend base URL, overrides the `backend` route
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Maximum attempts per upstream request
    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "desa-migrate")]
#[command(about = "Copy village portal SQLite databases into MySQL")]
pub struct MigrateCli {
    /// Migration plan TOML; the built-in plan is used when omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// What to do with rows whose key already exists: ignore | overwrite
    #[arg(long)]
    pub on_conflict: Option<ConflictPolicy>,

    /// Default administrator password for the seeded account
    #[arg(long, env = "ADMIN_DEFAULT_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Write a per-table CSV report to this path
    #[arg(long)]
    pub report: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage after each source database")]
    pub monitor: bool,
}
