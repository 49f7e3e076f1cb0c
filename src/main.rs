//! Dependency Advisor - Main application entry point

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};

use dependency_advisor::{
    Config,
    application::{
        Advisor, BatchSettings, CollectorStats, DependencyAnalysisServiceImpl, SignalCollector,
    },
    infrastructure::{GeminiAdvisoryModel, GitHubRepositoryClient, OsvClient},
    init_tracing,
    presentation::{AppState, create_router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        Config::default()
    });

    init_tracing(&config.logging)?;

    tracing::info!("Starting dependency advisor...");
    tracing::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let apis = &config.apis;
    let analysis = &config.analysis;

    let github_client = GitHubRepositoryClient::from_token(
        apis.github.token.clone(),
        apis.github.base_url.clone(),
        apis.github.commit_sample_size,
    )?;
    if apis.github.token.as_deref().is_none_or(|t| t.trim().is_empty()) {
        tracing::info!("GitHub token not provided; repository signals use the unauthenticated rate limit");
    }

    let osv_client = OsvClient::new(
        apis.osv.base_url.clone(),
        Duration::from_secs(apis.osv.timeout_seconds),
    )?;

    let advisory_model = GeminiAdvisoryModel::new(
        apis.advisory.api_url.clone(),
        apis.advisory.api_key.clone(),
        Duration::from_secs(apis.advisory.timeout_seconds),
    )?;
    if !advisory_model.is_configured() {
        tracing::warn!("Advisory model API key not configured; recommendations will be rule based");
    }

    let collector_stats = Arc::new(CollectorStats::new());

    let collector = SignalCollector::new(
        Arc::new(github_client),
        Arc::new(osv_client),
        collector_stats.clone(),
    )
    .with_search_limit(apis.github.search_limit)
    .with_resilience(
        analysis
            .circuit_breaker
            .to_breaker_config(apis.github.timeout_seconds),
        analysis
            .circuit_breaker
            .to_breaker_config(apis.osv.timeout_seconds),
        analysis.retry.to_retry_config(),
    );

    let advisor = Advisor::with_breaker(
        Arc::new(advisory_model),
        analysis
            .circuit_breaker
            .to_breaker_config(apis.advisory.timeout_seconds),
        collector_stats.clone(),
    );

    let analysis_service = DependencyAnalysisServiceImpl::new(Arc::new(collector), Arc::new(advisor))
        .with_batch_settings(BatchSettings {
            max_concurrent_analyses: analysis.max_concurrent_analyses,
            batch_timeout: Duration::from_secs(analysis.batch_timeout_seconds),
        });

    let app_state = AppState::new(Arc::new(analysis_service), collector_stats);
    let app = create_router(app_state, &config);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    tracing::info!("Server listening on {}", addr);
    if config.server.enable_docs {
        tracing::info!("API documentation available at http://{}/docs", addr);
    } else {
        tracing::info!("API documentation disabled (enable_docs=false)");
    }

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
