use burnbox::{
    audit::{FanoutAuditSink, SqliteAuditSink, TracingAuditSink},
    config::AppConfig,
    db, web, AppError, ExpirySweeper, SecretService, SecretVault,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burnbox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Burnbox v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("Configuration loaded");

    let cipher = match config.crypto.build_cipher() {
        Ok(cipher) => Arc::new(cipher),
        Err(AppError::MissingKey) => {
            error!("Encryption key not configured!");
            error!("Generate one with: openssl rand -base64 32");
            error!("Then set crypto.encryption_key in config/default.toml or BURNBOX_CRYPTO__ENCRYPTION_KEY env var");
            error!("Or set BURNBOX_CRYPTO__ALLOW_EPHEMERAL_KEY=true for a throwaway, non-production key");
            return Err(anyhow::anyhow!("Encryption key not configured"));
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to load encryption key: {}", e)),
    };

    // Audit sinks: always tracing, plus SQLite when configured
    let mut audit = FanoutAuditSink::new(vec![Arc::new(TracingAuditSink)]);
    let mut audit_writer = None;
    if let Some(url) = &config.audit.database_url {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.audit.max_connections)
            .connect(url)
            .await?;
        info!("Audit database connected: {}", url);
        db::init_db(&pool).await?;

        let (sink, writer) = SqliteAuditSink::spawn(pool, config.audit.channel_capacity);
        audit.push(Arc::new(sink));
        audit_writer = Some(writer);
    }

    let vault = Arc::new(SecretVault::new(
        config.vault.vault_config(),
        Arc::new(audit),
    ));
    let sweeper = ExpirySweeper::new(vault.clone(), config.vault.sweep_interval()).spawn();

    let app = web::create_router(SecretService::new(vault, cipher));

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    // Stop the sweeper before the vault goes away
    sweeper.shutdown().await;

    // Every sink sender is gone once the vault is dropped; let the writer drain
    if let Some(writer) = audit_writer {
        match tokio::time::timeout(Duration::from_secs(5), writer).await {
            Ok(Ok(())) => info!("Audit log flushed"),
            Ok(Err(e)) => error!("Audit writer failed: {}", e),
            Err(_) => warn!("Timed out flushing audit log"),
        }
    }

    served?;
    info!("Shut down cleanly");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received");
}
