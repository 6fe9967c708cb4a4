use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use snippet_auth::routes::create_app;
use snippet_auth::shared::config::{AppConfig, StoreBackend};
use snippet_auth::shared::database::{Database, MemoryStore, Stores};
use snippet_auth::shared::logging;
use snippet_auth::shared::services::AppState;
use snippet_auth::shared::utils::{SharedClock, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init(config.log_format)?;
    info!(?config, "configuration loaded");

    // 저장소 선택
    let stores = match &config.store {
        StoreBackend::Postgres { url, max_connections } => {
            let db = Database::new(url, *max_connections).await?;
            db.initialize().await?;
            Stores::postgres(&db)
        }
        StoreBackend::Memory => {
            info!("using in-memory store; data is lost on exit");
            Stores::memory(MemoryStore::new())
        }
    };

    // AppState 생성 (모든 Service 초기화) + 주기 작업 시작
    let clock: SharedClock = Arc::new(SystemClock);
    let cancel = CancellationToken::new();
    let (app_state, mut tasks) = AppState::new(&config, stores, clock, &cancel)?;
    app_state.start_maintenance(&cancel, &mut tasks);

    let mut app = create_app(app_state);

    // CORS 설정
    if let Some(origin) = &config.cors_origin {
        let cors = CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS_ORIGIN: {}", origin))?,
            )
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true);
        app = app.layer(cors);
    }

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");
    info!("Swagger UI available at http://{}/api", config.bind_addr);

    // 서버 실행 (종료 신호 → 요청 처리 완료 → 백그라운드 태스크 정리)
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("Server error")?;

    cancel.cancel();
    tasks.join().await;
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    cancel.cancel();
}
