//! Proxy server library: axum app assembly, API-key authentication, and
//! graceful shutdown, reusable by both the `clasp` binary and integration
//! tests.

mod auth;
mod error;
mod health;
mod metrics;

use std::net::SocketAddr;

use axum::{Router, middleware, routing::get};
use config::Config;
use llm::LlmState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::Error;

/// Configuration for serving the proxy.
pub struct ServeConfig {
    /// The socket address the server will bind to.
    pub listen_address: SocketAddr,
    /// The bound configuration.
    pub config: Config,
    /// Cancellation token for graceful shutdown.
    pub shutdown_signal: CancellationToken,
    /// The version string to log on startup.
    pub version: String,
}

/// Builds the app (without binding) for use in tests that drive it with
/// `tower::ServiceExt::oneshot` or an in-process client.
pub fn app(config: Config) -> Router {
    let auth = config.auth.clone();
    let state = LlmState::new(config);

    let messages = protect(llm::router(state.clone()), &auth, auth.enabled);

    let health = Router::new().route("/health", get(health::health)).with_state(state.clone());
    let health = protect(health, &auth, auth.enabled && auth.require_for_health);

    let metrics = Router::new()
        .route("/metrics", get(metrics::metrics_json))
        .route("/metrics/prometheus", get(metrics::metrics_prometheus))
        .with_state(state);
    let metrics = protect(metrics, &auth, auth.enabled && auth.require_for_metrics);

    messages.merge(health).merge(metrics)
}

/// Wraps `router` with the API-key middleware when `require` is set; a
/// no-op otherwise, so `/v1/messages` and the observability endpoints can
/// be gated independently (§6).
fn protect(router: Router, auth: &config::AuthConfig, require: bool) -> Router {
    if require {
        router.layer(middleware::from_fn_with_state(auth.clone(), auth::require_api_key))
    } else {
        router
    }
}

/// Starts and runs the proxy with the provided configuration.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        version,
    }: ServeConfig,
) -> anyhow::Result<()> {
    log::info!("clasp {version}");

    let app = app(config);

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(Error::Bind)?;

    log::info!("listening on http://{listen_address}");

    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result.map_err(Error::Server)?;
        }
        _ = shutdown_signal.cancelled() => {
            log::info!("received shutdown signal, shutting down gracefully...");
        }
    }

    Ok(())
}
