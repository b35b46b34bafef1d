//! Hera CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: global options from flags or `HERA_*`
//!    environment variables, one subcommand per client operation.
//! 2. **Wire observability**: `tracing-subscriber` with an env filter, a
//!    pretty or JSON formatter on stderr, and an optional OpenTelemetry OTLP
//!    exporter. All spans and events from `hera` and `soap` flow through it.
//! 3. **Construct infrastructure**: a [`soap::SoapBinder`] injected into a
//!    [`hera::Client`].
//! 4. **Run one operation** and print its result as JSON on stdout.

mod commands;
mod telemetry;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hera::ApiVersion;

use telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "hera",
    version,
    about = "Administer a load balancer / cache appliance through its SOAP control API"
)]
pub struct Cli {
    /// Control-API endpoint, e.g. https://lb.example.com:9090/soap
    #[arg(long, env = "HERA_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Admin account name
    #[arg(long, env = "HERA_USERNAME", global = true)]
    pub username: Option<String>,

    /// Admin password
    #[arg(long, env = "HERA_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Directory holding the service descriptions (*.wsdl)
    #[arg(long, env = "HERA_WSDL_PATH", default_value = hera::DEFAULT_DESCRIPTION_DIR, global = true)]
    pub wsdl_path: PathBuf,

    /// Module bound at startup
    #[arg(long, env = "HERA_MODULE", default_value = "System.Cache", global = true)]
    pub module: String,

    /// Control-API version (<major>.<minor>)
    #[arg(long, env = "HERA_API_VERSION", default_value_t = ApiVersion::DEFAULT, global = true)]
    pub api_version: ApiVersion,

    /// Accept invalid TLS certificates (self-signed admin certificates)
    #[arg(long, env = "HERA_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "HERA_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Log format on stderr
    #[arg(long, env = "HERA_LOG_FORMAT", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; spans are exported when set
    #[arg(long, env = "HERA_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List modules available in the description directory (no network)
    Modules,
    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that connect to the appliance.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// List virtual server names
    VirtualServers,
    /// Enabled state of virtual servers (all of them when none are named)
    EnabledVirtualServers { names: Vec<String> },
    /// List pool names
    Pools,
    /// Nodes of a pool
    Nodes { pool: String },
    /// Active connections per node
    ConnectionCounts {
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Disabled nodes of a pool
    DisabledNodes { pool: String },
    /// Disable nodes; refused while any of them has active connections
    DisableNodes {
        pool: String,
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Draining nodes of a pool
    DrainingNodes { pool: String },
    /// Set the draining nodes of a pool (no nodes clears draining)
    DrainNodes { pool: String, nodes: Vec<String> },
    /// Re-enable nodes
    EnableNodes {
        pool: String,
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Global cache statistics
    CacheInfo,
    /// Flush the whole web cache
    FlushAll,
    /// Flush cached objects matching a URL pattern (`*` wildcards allowed)
    Flush {
        url: String,
        /// Look up and print the flushed URLs first
        #[arg(long)]
        list: bool,
    },
    /// Cached objects matching a URL pattern
    Objects {
        url: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// First cached object matching a URL pattern
    Object { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format, cli.otlp_endpoint.as_deref())?;

    let result = commands::run(&cli).await;
    telemetry.shutdown();

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
