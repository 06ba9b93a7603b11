//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::IpAddr, net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, DatabaseOverride, PollArgs, ReconcileArgs, ServeArgs, ServeOverrides,
};

use crate::application::connections::ConnectionsConfig;
use crate::application::jobs::reconcile_schedule;
use crate::application::reconcile::{PollSchedule, ReconcileConfig};
use crate::application::registry::RegistryConfig;
use crate::application::retry::RetryPolicy;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "siteline";
const ENV_PREFIX: &str = "SITELINE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_HOSTING_API_BASE_URL: &str = "https://firebasehosting.googleapis.com";
const DEFAULT_SITE_NAMESPACE: &str = "site";
const DEFAULT_DOMAIN_SUFFIX: &str = "web.app";
const DEFAULT_HOSTING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
const DEFAULT_RECONCILE_SCHEDULE: &str = "0 */5 * * * *";
const DEFAULT_RECONCILE_BATCH_SIZE: u32 = 25;
const DEFAULT_RECONCILE_CONCURRENCY: u32 = 4;
const DEFAULT_DNS_MAX_ATTEMPTS: u32 = 60;
const DEFAULT_SSL_MAX_ATTEMPTS: u32 = 96;
const DEFAULT_DNS_INTERVAL_SECS: u64 = 5 * 60;
const DEFAULT_SSL_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_MAX_AGE_HOURS: u64 = 72;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub hosting: HostingSettings,
    pub dns: DnsSettings,
    pub deploy: RetrySettings,
    pub site_registry: RetrySettings,
    pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct HostingSettings {
    pub api_base_url: Url,
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    pub site_namespace: String,
    pub default_domain_suffix: String,
    pub fallback_host_addresses: Vec<IpAddr>,
    pub request_timeout: Duration,
}

/// DNS automation is enabled only when both the endpoint and key are set.
#[derive(Debug, Clone, Default)]
pub struct DnsSettings {
    pub api_base_url: Option<Url>,
    pub api_key: Option<String>,
}

impl DnsSettings {
    pub fn is_enabled(&self) -> bool {
        self.api_base_url.is_some() && self.api_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: NonZeroU32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub schedule: String,
    pub batch_size: NonZeroU32,
    pub concurrency: NonZeroU32,
    pub dns_max_attempts: NonZeroU32,
    pub ssl_max_attempts: NonZeroU32,
    pub dns_interval: Duration,
    pub ssl_interval: Duration,
    pub max_age: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_attempts.get(),
            settings.base_delay,
            settings.max_delay,
        )
    }
}

impl Settings {
    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            dns_interval: self.reconcile.dns_interval,
            ssl_interval: self.reconcile.ssl_interval,
        }
    }

    fn fallback_addresses(&self) -> Vec<String> {
        self.hosting
            .fallback_host_addresses
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn registry_config(&self, default_project_id: &str) -> RegistryConfig {
        RegistryConfig {
            default_project_id: default_project_id.to_string(),
            namespace: self.hosting.site_namespace.clone(),
            default_domain_suffix: self.hosting.default_domain_suffix.clone(),
            retry: RetryPolicy::from(&self.site_registry),
        }
    }

    pub fn connections_config(&self) -> ConnectionsConfig {
        ConnectionsConfig {
            fallback_host_addresses: self.fallback_addresses(),
            schedule: self.poll_schedule(),
            retry: RetryPolicy::from(&self.site_registry),
        }
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            schedule: self.poll_schedule(),
            dns_max_attempts: clamp_i32(self.reconcile.dns_max_attempts),
            ssl_max_attempts: clamp_i32(self.reconcile.ssl_max_attempts),
            max_age: self.reconcile.max_age,
            batch_size: self.reconcile.batch_size.get(),
            concurrency: self.reconcile.concurrency.get() as usize,
            fallback_host_addresses: self.fallback_addresses(),
        }
    }
}

fn clamp_i32(value: NonZeroU32) -> i32 {
    i32::try_from(value.get()).unwrap_or(i32::MAX)
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("hosting.fallback_host_addresses")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Reconcile(args)) => {
            raw.apply_database_override(&args.database);
            if let Some(batch_size) = args.batch_size {
                raw.reconcile.batch_size = Some(batch_size);
            }
        }
        Some(Command::Poll(args)) => raw.apply_database_override(&args.database),
        None => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    hosting: RawHostingSettings,
    dns: RawDnsSettings,
    deploy: RawRetrySettings,
    site_registry: RawRetrySettings,
    reconcile: RawReconcileSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(url) = overrides.hosting_api_base_url.as_ref() {
            self.hosting.api_base_url = Some(url.clone());
        }
        if let Some(project) = overrides.hosting_project_id.as_ref() {
            self.hosting.project_id = Some(project.clone());
        }
        if let Some(schedule) = overrides.reconcile_schedule.as_ref() {
            self.reconcile.schedule = Some(schedule.clone());
        }
        if let Some(batch_size) = overrides.reconcile_batch_size {
            self.reconcile.batch_size = Some(batch_size);
        }
        if let Some(concurrency) = overrides.reconcile_concurrency {
            self.reconcile.concurrency = Some(concurrency);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            hosting,
            dns,
            deploy,
            site_registry,
            reconcile,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            hosting: build_hosting_settings(hosting)?,
            dns: build_dns_settings(dns)?,
            deploy: build_retry_settings(deploy, DEPLOY_RETRY_KEYS)?,
            site_registry: build_retry_settings(site_registry, REGISTRY_RETRY_KEYS)?,
            reconcile: build_reconcile_settings(reconcile)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    Ok(DatabaseSettings {
        url: non_blank(database.url),
        max_connections: non_zero_u32(max_connections.into(), "database.max_connections")?,
    })
}

fn build_hosting_settings(hosting: RawHostingSettings) -> Result<HostingSettings, LoadError> {
    let base = non_blank(hosting.api_base_url)
        .unwrap_or_else(|| DEFAULT_HOSTING_API_BASE_URL.to_string());
    let api_base_url = parse_http_url(&base, "hosting.api_base_url")?;

    let site_namespace = non_blank(hosting.site_namespace)
        .unwrap_or_else(|| DEFAULT_SITE_NAMESPACE.to_string())
        .to_ascii_lowercase();
    if !site_namespace
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        return Err(LoadError::invalid(
            "hosting.site_namespace",
            "only a-z, 0-9 and hyphens are allowed",
        ));
    }

    let default_domain_suffix = non_blank(hosting.default_domain_suffix)
        .unwrap_or_else(|| DEFAULT_DOMAIN_SUFFIX.to_string())
        .trim_start_matches('.')
        .to_string();

    let fallback_host_addresses = hosting
        .fallback_host_addresses
        .unwrap_or_default()
        .iter()
        .map(|value| {
            value.trim().parse::<IpAddr>().map_err(|err| {
                LoadError::invalid(
                    "hosting.fallback_host_addresses",
                    format!("`{value}` is not an IP address: {err}"),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let timeout_secs = hosting
        .request_timeout_seconds
        .unwrap_or(DEFAULT_HOSTING_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "hosting.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(HostingSettings {
        api_base_url,
        project_id: non_blank(hosting.project_id),
        access_token: non_blank(hosting.access_token),
        site_namespace,
        default_domain_suffix,
        fallback_host_addresses,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_dns_settings(dns: RawDnsSettings) -> Result<DnsSettings, LoadError> {
    let api_base_url = non_blank(dns.api_base_url)
        .map(|value| parse_http_url(&value, "dns.api_base_url"))
        .transpose()?;

    Ok(DnsSettings {
        api_base_url,
        api_key: non_blank(dns.api_key),
    })
}

fn build_retry_settings(
    retry: RawRetrySettings,
    keys: RetryKeys,
) -> Result<RetrySettings, LoadError> {
    let max_attempts = non_zero_u32(
        retry
            .max_attempts
            .unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS)
            .into(),
        keys.max_attempts,
    )?;
    let base_delay = Duration::from_millis(
        retry
            .base_delay_ms
            .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
    );
    let max_delay =
        Duration::from_millis(retry.max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS));
    if max_delay < base_delay {
        return Err(LoadError::invalid(
            keys.max_delay,
            "must not be smaller than base_delay_ms",
        ));
    }

    Ok(RetrySettings {
        max_attempts,
        base_delay,
        max_delay,
    })
}

fn build_reconcile_settings(
    reconcile: RawReconcileSettings,
) -> Result<ReconcileSettings, LoadError> {
    let schedule = non_blank(reconcile.schedule)
        .unwrap_or_else(|| DEFAULT_RECONCILE_SCHEDULE.to_string());
    reconcile_schedule(&schedule).map_err(|err| {
        LoadError::invalid("reconcile.schedule", format!("invalid cron expression: {err}"))
    })?;

    let dns_interval_secs = reconcile
        .dns_interval_seconds
        .unwrap_or(DEFAULT_DNS_INTERVAL_SECS);
    if dns_interval_secs == 0 {
        return Err(LoadError::invalid(
            "reconcile.dns_interval_seconds",
            "must be greater than zero",
        ));
    }
    let ssl_interval_secs = reconcile
        .ssl_interval_seconds
        .unwrap_or(DEFAULT_SSL_INTERVAL_SECS);
    if ssl_interval_secs == 0 {
        return Err(LoadError::invalid(
            "reconcile.ssl_interval_seconds",
            "must be greater than zero",
        ));
    }
    let max_age_hours = reconcile.max_age_hours.unwrap_or(DEFAULT_MAX_AGE_HOURS);
    if max_age_hours == 0 {
        return Err(LoadError::invalid(
            "reconcile.max_age_hours",
            "must be greater than zero",
        ));
    }

    Ok(ReconcileSettings {
        schedule,
        batch_size: non_zero_u32(
            reconcile
                .batch_size
                .unwrap_or(DEFAULT_RECONCILE_BATCH_SIZE)
                .into(),
            "reconcile.batch_size",
        )?,
        concurrency: non_zero_u32(
            reconcile
                .concurrency
                .unwrap_or(DEFAULT_RECONCILE_CONCURRENCY)
                .into(),
            "reconcile.concurrency",
        )?,
        dns_max_attempts: non_zero_u32(
            reconcile
                .dns_max_attempts
                .unwrap_or(DEFAULT_DNS_MAX_ATTEMPTS)
                .into(),
            "reconcile.dns_max_attempts",
        )?,
        ssl_max_attempts: non_zero_u32(
            reconcile
                .ssl_max_attempts
                .unwrap_or(DEFAULT_SSL_MAX_ATTEMPTS)
                .into(),
            "reconcile.ssl_max_attempts",
        )?,
        dns_interval: Duration::from_secs(dns_interval_secs),
        ssl_interval: Duration::from_secs(ssl_interval_secs),
        max_age: Duration::from_secs(max_age_hours * 60 * 60),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHostingSettings {
    api_base_url: Option<String>,
    project_id: Option<String>,
    access_token: Option<String>,
    site_namespace: Option<String>,
    default_domain_suffix: Option<String>,
    fallback_host_addresses: Option<Vec<String>>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDnsSettings {
    api_base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct RetryKeys {
    max_attempts: &'static str,
    max_delay: &'static str,
}

const DEPLOY_RETRY_KEYS: RetryKeys = RetryKeys {
    max_attempts: "deploy.max_attempts",
    max_delay: "deploy.max_delay_ms",
};

const REGISTRY_RETRY_KEYS: RetryKeys = RetryKeys {
    max_attempts: "site_registry.max_attempts",
    max_delay: "site_registry.max_delay_ms",
};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawReconcileSettings {
    schedule: Option<String>,
    batch_size: Option<u32>,
    concurrency: Option<u32>,
    dns_max_attempts: Option<u32>,
    ssl_max_attempts: Option<u32>,
    dns_interval_seconds: Option<u64>,
    ssl_interval_seconds: Option<u64>,
    max_age_hours: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value)
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
