use std::error::Error;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use paygate::adapters::http::{app_router, AppState};
use paygate::adapters::{
    PostgresPaymentSessionRepository, PostgresReconciliationStore,
    PostgresWebhookConfigRepository,
};
use paygate::application::handlers::{
    CreatePaymentSessionHandler, ExpireStaleSessionsHandler, GetSessionStatusHandler,
    ProcessWebhookHandler, TransactionReconciler, WebhookAuthGate,
};
use paygate::config::AppConfig;
use paygate::domain::crypto::SecretCipher;
use paygate::domain::foundation::Timestamp;
use paygate::ports::{PaymentSessionRepository, ReconciliationStore, WebhookConfigRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server.log_level, config.is_production());

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    let cipher = Arc::new(SecretCipher::new(&config.security.master_encryption_key)?);
    let session_policy = config.payments.session_policy()?;
    let polling = config.payments.polling_contract()?;

    let webhook_configs: Arc<dyn WebhookConfigRepository> =
        Arc::new(PostgresWebhookConfigRepository::new(pool.clone()));
    let sessions: Arc<dyn PaymentSessionRepository> =
        Arc::new(PostgresPaymentSessionRepository::new(pool.clone()));
    let store: Arc<dyn ReconciliationStore> = Arc::new(PostgresReconciliationStore::new(pool));

    match ExpireStaleSessionsHandler::new(sessions.clone())
        .handle(Timestamp::now())
        .await
    {
        Ok(count) => info!(expired = count, "stale session sweep finished"),
        Err(e) => warn!(error = %e, "stale session sweep failed"),
    }

    let gate = Arc::new(WebhookAuthGate::new(webhook_configs, cipher));
    let reconciler = Arc::new(TransactionReconciler::new(store, sessions.clone()));
    let state = AppState {
        process_webhook: Arc::new(
            ProcessWebhookHandler::new(gate, reconciler)
                .with_timeout(config.payments.webhook_timeout()),
        ),
        create_session: Arc::new(CreatePaymentSessionHandler::new(
            sessions.clone(),
            session_policy,
        )),
        session_status: Arc::new(GetSessionStatusHandler::new(sessions, polling)),
        request_timeout: config.server.request_timeout(),
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(address = %addr, error = %e, "failed to bind listener");
        e
    })?;

    info!(address = %addr, environment = ?config.server.environment, "paygate listening");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("paygate stopped");
    Ok(())
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}
