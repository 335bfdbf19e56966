use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use medchat_gateway::clock::SystemClock;
use medchat_gateway::config::Args;
use medchat_gateway::limiter::{RateLimiter, purge_task};
use medchat_gateway::llm::LlmClient;
use medchat_gateway::rate_limit::RateLimitStore;
use medchat_gateway::routes::router;
use medchat_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // parse cli arguments
    let args = Args::parse();
    args.validate()?;

    let policy = args.rate_limit_policy();
    let limiter = Arc::new(RateLimiter::new(
        Arc::new(RateLimitStore::new()),
        Arc::new(SystemClock::new()),
        policy,
    )?);

    let mut llm = LlmClient::new(
        reqwest::Client::new(),
        &args.llm_base_url,
        args.llm_api_key.clone(),
        args.llm_model.clone(),
        args.llm_vision_model.clone(),
    );
    if let Some(base) = &args.file_base_url {
        llm = llm.with_file_base_url(base)?;
    }

    // creating shared state
    let state = Arc::new(AppState {
        limiter: limiter.clone(),
        llm,
        trust_forwarded_for: args.trust_forwarded_for,
    });

    // spawn the background sweeper
    tokio::spawn(purge_task(limiter, args.purge_every()));

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Gateway listening");
    info!(llm = %args.llm_base_url, "Forwarding chat to language model");
    info!(
        limit = policy.limit,
        window_ms = policy.window.as_millis() as u64,
        "Rate limit configured"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gateway stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
