use anonpoll::config::ServerConfig;
use anonpoll::{routes, services, state};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let state = state::AppState::new(config.polls);

    // Spawn background expiry sweep.
    let _cleanup = services::cleanup::spawn_cleanup_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(
        port = config.port,
        voting_window_secs = config.polls.voting_window.as_secs(),
        retention_secs = config.polls.retention.as_secs(),
        "anonpoll listening"
    );
    axum::serve(listener, app).await.expect("server failed");
}
