use clap::{Args, Parser, Subcommand, ValueEnum};
use wif_gcp::rest::{DEFAULT_IAM_ENDPOINT, DEFAULT_RESOURCE_MANAGER_ENDPOINT};
use wif_ocm::rest::DEFAULT_OCM_URL;

#[derive(Parser, Debug)]
#[command(name = "ocm-wif", author, version, about, long_about = None)]
/// Provision, verify and repair GCP Workload Identity Federation configs
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the management API
    #[arg(long, global = true, env = "OCM_URL", default_value = DEFAULT_OCM_URL)]
    pub ocm_url: String,

    /// Bearer token for the management API
    #[arg(long, global = true, env = "OCM_TOKEN", hide_env_values = true)]
    pub ocm_token: Option<String>,

    /// OAuth access token for GCP
    #[arg(
        long,
        global = true,
        env = "GOOGLE_OAUTH_ACCESS_TOKEN",
        hide_env_values = true
    )]
    pub gcp_token: Option<String>,

    /// IAM API endpoint
    #[arg(long, global = true, env = "WIF_IAM_ENDPOINT", default_value = DEFAULT_IAM_ENDPOINT)]
    pub iam_endpoint: String,

    /// Cloud Resource Manager API endpoint
    #[arg(
        long,
        global = true,
        env = "WIF_RESOURCE_MANAGER_ENDPOINT",
        default_value = DEFAULT_RESOURCE_MANAGER_ENDPOINT
    )]
    pub resource_manager_endpoint: String,

    /// Seconds between long-running operation polls
    #[arg(long, global = true, env = "WIF_POLL_INTERVAL_SECS", default_value_t = 2)]
    pub poll_interval_secs: u64,

    /// Polls before a long-running operation is considered timed out
    #[arg(long, global = true, env = "WIF_POLL_ATTEMPTS", default_value_t = 30)]
    pub poll_attempts: u32,

    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true, env = "WIF_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log output format
    #[arg(long, global = true, env = "WIF_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register a WIF config and provision its GCP resources
    Create {
        /// Display name of the new config
        #[arg(long)]
        name: String,
        /// GCP project id that will host the pool and service accounts
        #[arg(long)]
        project: String,
        /// Plan only; issue no mutating GCP call
        #[arg(long)]
        dry_run: bool,
    },
    /// Check GCP resources against a WIF config without changing anything
    Verify {
        /// WIF config id
        id: String,
    },
    /// Repair drift between GCP and a WIF config
    Update {
        /// WIF config id
        id: String,
    },
    /// Delete a WIF config and its GCP resources
    #[command(visible_alias = "rm")]
    Delete {
        /// WIF config id
        id: String,
        /// Plan only; delete nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a WIF config as JSON
    Get {
        /// WIF config id
        id: String,
        /// Print on a single line
        #[arg(long)]
        single: bool,
    },
    /// List WIF configs
    #[command(visible_alias = "ls")]
    List,
    /// Summarize a WIF config
    Describe {
        /// WIF config id
        id: String,
    },
}
