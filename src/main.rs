use climb_usage::api::{self, AppState};
use climb_usage::config::ServiceConfig;
use climb_usage::usage::{ProcessEnv, UsageSampler};
use climb_usage::CgroupReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ServiceConfig::from_env(&ProcessEnv)?;

    climb_usage::tracing::init_tracing(
        "climb-usage",
        config.log_format,
        config.otlp_endpoint.as_deref(),
    )?;

    if config.auth_token.is_none() {
        warn!("No API token configured, serving without authentication");
    }

    let sampler = UsageSampler::new(CgroupReader::new(&config.cgroup_root), config.volumes());
    let app = api::router(AppState::new(sampler, config.auth_token.clone()), &config.base_url);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        bind = %config.bind,
        base_url = %config.base_url,
        cgroup_root = %config.cgroup_root.display(),
        "Usage service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    climb_usage::tracing::shutdown_tracing();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
