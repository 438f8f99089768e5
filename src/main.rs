use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::{signal, sync::mpsc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use sakinah_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Cache backend: redis when reachable, in-process fallback otherwise
    let cache: Arc<dyn api::cache::CacheBackend> =
        match api::cache::RedisCache::connect(&cfg.redis_url).await {
            Ok(redis) => {
                info!("Using redis cache backend");
                Arc::new(redis)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable; using in-memory cache backend");
                Arc::new(api::cache::InMemoryCache::new())
            }
        };

    // Events: post-commit side effects ride on this channel
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(
        event_rx,
        cache.clone(),
        Duration::from_secs(cfg.notification_ttl_secs),
    ));

    let auth_service = Arc::new(api::auth::AuthService::new(
        db_arc.clone(),
        cfg.jwt_secret.clone(),
        cfg.jwt_expiration,
    ));

    let throttle = api::rate_limiter::AttemptThrottle::new(
        cache.clone(),
        api::rate_limiter::ThrottleConfig {
            max_attempts: cfg.login_max_attempts,
            window: Duration::from_secs(cfg.login_window_secs),
        },
    );

    let services = api::services::AppServices::new(db_arc.clone(), event_sender.clone());

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
        cache,
        auth: auth_service,
        throttle,
    };

    let cors_layer = if cfg.is_development() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "sakinah-api up" }))
        .route(
            "/api-docs/openapi.json",
            get(|| async { axum::Json(api::openapi::openapi_json()) }),
        )
        .nest("/api/v1", api::api_v1_routes())
        .layer(axum::middleware::from_fn(api::request_logging_middleware))
        .layer(cors_layer)
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port configuration")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
