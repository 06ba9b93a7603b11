use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the siteline binary.
#[derive(Debug, Parser)]
#[command(
    name = "siteline",
    version,
    about = "Hosted site provisioning and custom-domain reconciliation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SITELINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API and the reconciliation worker.
    Serve(Box<ServeArgs>),
    /// Run a single reconciliation scan and exit.
    Reconcile(ReconcileArgs),
    /// Poll one domain connection and print the outcome.
    Poll(PollArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the hosting provider API base URL.
    #[arg(long = "hosting-api-base-url", value_name = "URL")]
    pub hosting_api_base_url: Option<String>,

    /// Override the hosting provider project.
    #[arg(long = "hosting-project-id", value_name = "PROJECT")]
    pub hosting_project_id: Option<String>,

    /// Override the reconciliation cron expression.
    #[arg(long = "reconcile-schedule", value_name = "CRON")]
    pub reconcile_schedule: Option<String>,

    /// Override how many connections one scan considers.
    #[arg(long = "reconcile-batch-size", value_name = "COUNT")]
    pub reconcile_batch_size: Option<u32>,

    /// Override how many connections are polled concurrently.
    #[arg(long = "reconcile-concurrency", value_name = "COUNT")]
    pub reconcile_concurrency: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override how many connections the scan considers.
    #[arg(long = "batch-size", value_name = "COUNT")]
    pub batch_size: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct PollArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Connection to poll.
    #[arg(value_name = "CONNECTION_ID")]
    pub connection_id: Uuid,
}
