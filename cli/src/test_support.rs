//! In-process backends for client tests.

use std::net::SocketAddr;

use anonpoll::config::PollConfig;
use anonpoll::state::AppState;
use axum::Router;

use crate::api::PollApi;

/// A running backend and a client pointed at it.
pub struct Backend {
    pub api: PollApi,
}

/// Serve the real polling backend on an ephemeral port.
pub async fn spawn_backend() -> Backend {
    let state = AppState::new(PollConfig::default());
    Backend { api: spawn_stub(anonpoll::routes::app(state)).await }
}

/// Serve an arbitrary router on an ephemeral port; returns a client for it.
pub async fn spawn_stub(router: Router) -> PollApi {
    let addr = serve(router).await;
    PollApi::new(&format!("http://{addr}")).expect("valid base url")
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}
