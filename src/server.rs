use crate::config::Config;
use crate::config_validator::ConfigValidator;
use crate::error::{ApiError, ConfigError};
use crate::gbif::GbifClient;
use crate::handlers::{health_check, metrics, suggest, AppState, SharedState};
use crate::middleware::{
    load_shed_middleware, logging_middleware, metrics_middleware, rate_limit_middleware,
    request_id_middleware, REQUEST_ID_HEADER,
};
use axum::error_handling::HandleErrorLayer;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, BoxError, Router};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct Server {
    app: Router,
    state: SharedState,
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        ConfigValidator::validate(&config)?;

        let gbif = GbifClient::new(&config.gbif_base_url, config.gbif_timeout())?;
        let state = AppState::new(&config, Arc::new(gbif));
        let app = create_app(Arc::clone(&state), &config);

        Ok(Self { app, state, config })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        let sweeper = self.state.cache().spawn_sweeper();

        tracing::info!(
            host = %self.config.host_name,
            port = self.config.port,
            rate_limit = self.config.rate_limit,
            cache_ttl_secs = self.config.cache_ttl_seconds,
            "hostus server listening"
        );

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        tracing::info!("server stopped");
        served?;
        Ok(())
    }
}

/// Build the router: admission control on the suggest route, ambient layers on everything.
pub fn create_app(state: SharedState, config: &Config) -> Router {
    // Later route layers run first: rate limiting, then load shedding.
    let api = Router::new()
        .route("/api/v1/taxa/suggest", get(suggest))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            load_shed_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            rate_limit_middleware,
        ));

    Router::new()
        .merge(api)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(middleware::from_fn(logging_middleware))
                .layer(middleware::from_fn_with_state(
                    Arc::clone(&state),
                    metrics_middleware,
                ))
                .layer(cors_layer(config))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(config.request_timeout())),
        )
        .with_state(state)
}

/// Maps a request that outlived the request timeout to the upstream timeout body.
async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("request deadline elapsed");
        ApiError::GbifTimeout
    } else {
        ApiError::Internal(err.to_string())
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, REQUEST_ID_HEADER.clone()])
        .max_age(Duration::from_secs(86400));

    if config.allows_any_origin() {
        return layer.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_rejects_invalid_config() {
        let config = Config {
            cache_ttl_seconds: 0,
            ..Config::default()
        };
        assert!(matches!(Server::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_server_builds_with_defaults() {
        assert!(Server::new(Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_elapsed_deadline_maps_to_gateway_timeout() {
        let err: BoxError = Box::new(Elapsed::new());
        let response = handle_timeout_error(err).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::GATEWAY_TIMEOUT);

        let err: BoxError = "socket closed".into();
        let response = handle_timeout_error(err).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panic_payload_maps_to_internal_error() {
        let response = handle_panic(Box::new("index out of bounds"));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
