use std::sync::Arc;

use anyhow::{bail, Context};
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{error, info, warn};

use mams_portal as portal;
use portal::{
    config::{AppConfig, StoreBackend},
    store::{demo, AuthProvider, HostedStore, TableStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = portal::config::load_config().context("failed to load configuration")?;
    portal::config::init_tracing(cfg.log_level(), cfg.log_json);

    let (store, auth) = build_backend(&cfg)?;
    let app_state = portal::AppState::new(cfg.clone(), store, auth);
    let cors_layer = build_cors(&cfg)?;

    let app = portal::portal_routes()
        .merge(portal::openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(portal::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            portal::middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(app_state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("mams-portal listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_backend(
    cfg: &AppConfig,
) -> anyhow::Result<(Arc<dyn TableStore>, Arc<dyn AuthProvider>)> {
    match cfg.store_backend() {
        StoreBackend::Hosted => {
            info!(
                store_url = %cfg.store_url,
                anon_key = %cfg.masked_anon_key(),
                "using hosted store"
            );
            let hosted = Arc::new(
                HostedStore::new(&cfg.store_url, cfg.store_anon_key.clone())
                    .context("failed to build the store client")?,
            );
            let store: Arc<dyn TableStore> = hosted.clone();
            let auth: Arc<dyn AuthProvider> = hosted;
            Ok((store, auth))
        }
        StoreBackend::InMemory => {
            warn!("using the seeded in-memory store; data is lost on restart");
            let memory = Arc::new(demo::seeded_store());
            let store: Arc<dyn TableStore> = memory.clone();
            let auth: Arc<dyn AuthProvider> = memory;
            Ok((store, auth))
        }
    }
}

fn build_cors(cfg: &AppConfig) -> anyhow::Result<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(cfg.cors_allow_credentials))
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        bail!(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
        )
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
