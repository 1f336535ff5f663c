//! Server implementation
//!
//! HTTP startup, background task wiring, and graceful shutdown.

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerState};
use crate::stock::sweeper;
use axum::middleware;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

/// HTTP request log middleware
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// HTTP server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(self.config.clone())
                .await
                .map_err(|e| anyhow::anyhow!(e))?,
        };

        let mut tasks = BackgroundTasks::new();
        let sweep_engine = state.reservation_engine();
        let sweep_interval = self.config.sweep_interval();
        let sweep_shutdown = tasks.shutdown_token();
        tasks.spawn("reservation_sweeper", TaskKind::Periodic, async move {
            sweeper::run(sweep_engine, sweep_interval, sweep_shutdown).await;
        });

        let app = crate::api::build_app()
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            .layer(middleware::from_fn(log_request));

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Store server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await?;

        tasks.shutdown().await;
        Ok(())
    }
}
