//! etr-daemon entry point.
//!
//! Thin by intent: tracing, config, store and registry wiring, middleware,
//! then serve. Handlers live in `routes.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use etr_config::{report_unused_keys, resolve_secrets, AppConfig, UnusedKeyPolicy};
use etr_daemon::{routes, state};
use etr_reconcile::{AggregateStore, MemoryStore, ReconcileEngine};
use etr_registry::HttpRegistryClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

/// Comma-separated YAML paths, layered in order.
const ENV_CONFIG_PATHS: &str = "ETR_CONFIG_PATHS";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let raw_paths = std::env::var(ENV_CONFIG_PATHS).unwrap_or_default();
    let paths: Vec<&str> = raw_paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let (cfg, loaded) = AppConfig::load(&paths)?;
    if let Some(loaded) = &loaded {
        let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
        for ptr in &report.unused_leaf_pointers {
            warn!(pointer = %ptr, "unused config key");
        }
        info!(config_hash = %loaded.config_hash, "config loaded");
    }

    let registry = HttpRegistryClient::new(
        cfg.registry.base_url.clone(),
        cfg.registry.referer.clone(),
        cfg.registry.lang.clone(),
        Duration::from_secs(cfg.registry.timeout_secs),
    )
    .context("registry client")?;

    let store: Arc<dyn AggregateStore> = match resolve_secrets(&cfg).database_url {
        Some(url) => {
            let pool = etr_db::connect(&url).await?;
            etr_db::migrate(&pool).await?;
            info!("using postgres aggregate store");
            Arc::new(etr_db::PgAggregateStore::new(pool))
        }
        None => {
            warn!(
                env = %cfg.database.url_env,
                "database url not set; using in-memory store (data is lost on exit)"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let engine = ReconcileEngine::new(Arc::new(registry), store).with_lang(cfg.registry.lang.clone());
    let mut st = state::AppState::new(Arc::new(engine));
    if let Some(loaded) = loaded {
        st = st.with_config_hash(loaded.config_hash);
    }

    let app = routes::build_router(Arc::new(st))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = cfg
        .daemon
        .bind_addr
        .parse()
        .with_context(|| format!("invalid daemon bind_addr: {}", cfg.daemon.bind_addr))?;
    info!("etr-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any)
}
