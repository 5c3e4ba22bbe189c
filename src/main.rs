// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{http::header, http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, Resource, ResourceExt,
};
use plinth::{
    capabilities::spawn_version_poller,
    config::{LogFormat, OperatorArgs},
    constants::{
        ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
        VERSION_CHANGE_CHANNEL_CAPACITY,
    },
    context::Context,
    crd::{Dashboard, PipelineEngine, PlatformConfig},
    labels::{COMPONENT_DASHBOARD, COMPONENT_PIPELINES, PLINTH_COMPONENT_LABEL},
    metrics,
    reconcilers::{reconcile_dashboard, reconcile_pipeline_engine, reconcile_platform_config},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, Receiver};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let args = OperatorArgs::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("plinth-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

/// Initialize logging.
///
/// Respects `RUST_LOG` if set, otherwise defaults to INFO.
fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(args: OperatorArgs) -> Result<()> {
    init_logging(args.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Plinth operator");
    debug!(?args, "Parsed operator arguments");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let ctx = Arc::new(Context::new(client.clone(), args.settings()));

    // One channel per controller; a cluster upgrade re-reconciles everything
    let (platform_rx, engine_rx, dashboard_rx) = match args.version_poll_interval() {
        Some(interval) => {
            let (platform_tx, platform_rx) = mpsc::channel(VERSION_CHANGE_CHANNEL_CAPACITY);
            let (engine_tx, engine_rx) = mpsc::channel(VERSION_CHANGE_CHANNEL_CAPACITY);
            let (dashboard_tx, dashboard_rx) = mpsc::channel(VERSION_CHANGE_CHANNEL_CAPACITY);
            info!(interval_secs = interval.as_secs(), "Starting Kubernetes version poller");
            spawn_version_poller(
                client.clone(),
                interval,
                vec![platform_tx, engine_tx, dashboard_tx],
            );
            (Some(platform_rx), Some(engine_rx), Some(dashboard_rx))
        }
        None => {
            info!("Kubernetes version polling disabled");
            (None, None, None)
        }
    };

    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the main process
    tokio::select! {
        result = run_metrics_server(args.metrics_addr()) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = run_platform_config_controller(ctx.clone(), platform_rx) => {
            error!("CRITICAL: PlatformConfig controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("PlatformConfig controller exited unexpectedly without error")
        }
        result = run_pipeline_engine_controller(ctx.clone(), engine_rx) => {
            error!("CRITICAL: PipelineEngine controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("PipelineEngine controller exited unexpectedly without error")
        }
        result = run_dashboard_controller(ctx.clone(), dashboard_rx) => {
            error!("CRITICAL: Dashboard controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Dashboard controller exited unexpectedly without error")
        }
    }
}

/// Serve Prometheus metrics and a liveness endpoint.
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route("/healthz", get(|| async { (StatusCode::OK, "ok") }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, path = METRICS_SERVER_PATH, "Metrics server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

/// Watch config for Deployments generated by one component.
fn component_deployments(component: &str) -> Config {
    Config::default().labels(&format!("{PLINTH_COMPONENT_LABEL}={component}"))
}

/// Run the `PlatformConfig` controller
async fn run_platform_config_controller(
    ctx: Arc<Context>,
    version_changes: Option<Receiver<()>>,
) -> Result<()> {
    info!("Starting PlatformConfig controller");

    let api = Api::<PlatformConfig>::all(ctx.client.clone());
    let engines = Api::<PipelineEngine>::all(ctx.client.clone());
    let dashboards = Api::<Dashboard>::all(ctx.client.clone());

    let mut controller = Controller::new(api, Config::default())
        .owns(engines, Config::default())
        .owns(dashboards, Config::default());
    if let Some(rx) = version_changes {
        controller = controller.reconcile_all_on(ReceiverStream::new(rx));
    }

    controller
        .run(reconcile_platform_config_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `PipelineEngine` controller
async fn run_pipeline_engine_controller(
    ctx: Arc<Context>,
    version_changes: Option<Receiver<()>>,
) -> Result<()> {
    info!("Starting PipelineEngine controller");

    let api = Api::<PipelineEngine>::all(ctx.client.clone());
    let deployments = Api::<Deployment>::all(ctx.client.clone());

    let mut controller = Controller::new(api, Config::default())
        .owns(deployments, component_deployments(COMPONENT_PIPELINES));
    if let Some(rx) = version_changes {
        controller = controller.reconcile_all_on(ReceiverStream::new(rx));
    }

    controller
        .run(reconcile_pipeline_engine_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `Dashboard` controller
async fn run_dashboard_controller(
    ctx: Arc<Context>,
    version_changes: Option<Receiver<()>>,
) -> Result<()> {
    info!("Starting Dashboard controller");

    let api = Api::<Dashboard>::all(ctx.client.clone());
    let deployments = Api::<Deployment>::all(ctx.client.clone());

    let mut controller = Controller::new(api, Config::default())
        .owns(deployments, component_deployments(COMPONENT_DASHBOARD));
    if let Some(rx) = version_changes {
        controller = controller.reconcile_all_on(ReceiverStream::new(rx));
    }

    controller
        .run(reconcile_dashboard_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Record metrics and log the result of one reconcile.
fn finish_reconcile(
    kind: &str,
    name: &str,
    start: Instant,
    result: Result<Action>,
) -> Result<Action, ReconcileError> {
    match result {
        Ok(action) => {
            metrics::record_reconciliation_success(kind, start.elapsed());
            info!("Successfully reconciled {}: {}", kind, name);
            Ok(action)
        }
        Err(e) => {
            metrics::record_reconciliation_error(kind, start.elapsed());
            metrics::record_error(kind, "reconcile");
            error!("Failed to reconcile {} {}: {:#}", kind, name, e);
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `PlatformConfig`
async fn reconcile_platform_config_wrapper(
    config: Arc<PlatformConfig>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(name = %config.name_any(), "Reconcile wrapper called for PlatformConfig");
    let start = Instant::now();
    let result = reconcile_platform_config(ctx, (*config).clone()).await;
    finish_reconcile("PlatformConfig", &config.name_any(), start, result)
}

/// Reconcile wrapper for `PipelineEngine`
async fn reconcile_pipeline_engine_wrapper(
    engine: Arc<PipelineEngine>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let result = reconcile_pipeline_engine(ctx, (*engine).clone()).await;
    finish_reconcile("PipelineEngine", &engine.name_any(), start, result)
}

/// Reconcile wrapper for `Dashboard`
async fn reconcile_dashboard_wrapper(
    dashboard: Arc<Dashboard>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let result = reconcile_dashboard(ctx, (*dashboard).clone()).await;
    finish_reconcile("Dashboard", &dashboard.name_any(), start, result)
}

/// Error policy for all controllers
fn error_policy<K: Resource<DynamicType = ()>>(
    resource: Arc<K>,
    err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    warn!(
        name = %resource.name_any(),
        error = %err,
        "Reconcile failed, retrying in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    metrics::record_requeue(&K::kind(&()), "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
