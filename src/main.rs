use std::{process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use siteline::{
    application::{
        connections::ConnectionOrchestrator,
        deploy::ContentDeployer,
        dns::DnsAutomation,
        error::AppError,
        hosting::HostingApi,
        jobs::{
            ReconcileConnectionsContext, process_reconcile_connections_job, reconcile_schedule,
        },
        reconcile::{PollTarget, Reconciler},
        registry::SiteRegistry,
        repos::{ConnectionsRepo, EventsRepo, SitesRepo},
        retry::RetryPolicy,
    },
    config,
    infra::{
        db::PostgresRepositories,
        dns::RestDnsClient,
        error::InfraError,
        hosting::{HostingClientConfig, configure_hosting_client, hosting_client},
        http::{self, ApiState},
        telemetry,
    },
};
use siteline_api_types::PollResponse;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    configure_hosting_client(HostingClientConfig::from(&settings.hosting))
        .map_err(InfraError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Reconcile(_) => run_reconcile(settings).await,
        config::Command::Poll(args) => run_poll(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories.clone(), &settings)?;

    let monitor_handle = spawn_job_monitor(app.reconciler.clone(), &settings.reconcile)?;

    let state = ApiState {
        registry: app.registry,
        deployer: app.deployer,
        connections: app.connections,
        reconciler: app.reconciler,
        db: Some(repositories),
    };
    let result = serve_http(&settings, state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

async fn run_reconcile(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let summary = app
        .reconciler
        .poll_due()
        .await
        .map_err(|err| AppError::unexpected(format!("reconciliation scan failed: {err}")))?;

    info!(
        target = "siteline::reconcile",
        scanned = summary.scanned,
        polled = summary.polled,
        skipped = summary.skipped,
        completed = summary.completed,
        failed = summary.failed,
        errors = summary.errors,
        "Reconciliation scan finished"
    );
    Ok(())
}

async fn run_poll(settings: config::Settings, args: config::PollArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    let outcome = app
        .reconciler
        .poll_once(PollTarget::connection(args.connection_id))
        .await
        .map_err(|err| AppError::unexpected(format!("poll failed: {err}")))?;

    let response = PollResponse {
        is_complete: outcome.is_complete,
        requires_retry: outcome.requires_retry,
        next_check_delay_seconds: outcome.next_check_delay.map(|delay| delay.as_secs()),
        status: Some(outcome.status),
        error: outcome.error,
    };
    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

struct ApplicationContext {
    registry: Arc<SiteRegistry>,
    deployer: Arc<ContentDeployer>,
    connections: Arc<ConnectionOrchestrator>,
    reconciler: Arc<Reconciler>,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let repositories = PostgresRepositories::open(&settings.database).await?;
    Ok(Arc::new(repositories))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let project_id = settings
        .hosting
        .project_id
        .as_deref()
        .ok_or(InfraError::missing("hosting.project_id"))?;

    let sites_repo: Arc<dyn SitesRepo> = repositories.clone();
    let connections_repo: Arc<dyn ConnectionsRepo> = repositories.clone();
    let events_repo: Arc<dyn EventsRepo> = repositories;

    let hosting: Arc<dyn HostingApi> =
        hosting_client().map_err(|err| AppError::unexpected(err.to_string()))?;

    let dns: Option<Arc<dyn DnsAutomation>> = match (
        settings.dns.api_base_url.as_ref(),
        settings.dns.api_key.as_ref(),
    ) {
        (Some(base), Some(key)) => {
            let client =
                RestDnsClient::new(base.clone(), key.clone(), settings.hosting.request_timeout)
                    .map_err(InfraError::Dns)?;
            Some(Arc::new(client) as Arc<dyn DnsAutomation>)
        }
        _ => None,
    };

    let registry = SiteRegistry::new(
        sites_repo.clone(),
        hosting.clone(),
        settings.registry_config(project_id),
    );
    let deployer = ContentDeployer::new(
        sites_repo.clone(),
        hosting.clone(),
        RetryPolicy::from(&settings.deploy),
    );
    let connections = ConnectionOrchestrator::new(
        sites_repo.clone(),
        connections_repo.clone(),
        events_repo.clone(),
        registry.clone(),
        deployer.clone(),
        hosting.clone(),
        dns,
        settings.connections_config(),
    );
    let reconciler = Reconciler::new(
        sites_repo,
        connections_repo,
        events_repo,
        hosting,
        settings.reconcile_config(),
    );

    Ok(ApplicationContext {
        registry: Arc::new(registry),
        deployer: Arc::new(deployer),
        connections: Arc::new(connections),
        reconciler: Arc::new(reconciler),
    })
}

fn spawn_job_monitor(
    reconciler: Arc<Reconciler>,
    reconcile: &config::ReconcileSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = reconcile_schedule(&reconcile.schedule)
        .map_err(|err| AppError::validation(format!("invalid reconcile schedule: {err}")))?;

    let reconcile_worker = WorkerBuilder::new("reconcile-connections-worker")
        .data(ReconcileConnectionsContext { reconciler })
        .backend(CronStream::new(schedule))
        .build_fn(process_reconcile_connections_job);

    let monitor = Monitor::new().register(reconcile_worker);

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "siteline::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let server =
        axum::serve(listener, router.into_make_service()).with_graceful_shutdown(shutdown_signal());
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "siteline::http",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
