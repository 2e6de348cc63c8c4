use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use payflow_backend::api::{router, AppState};
use payflow_backend::config::AppConfig;
use payflow_backend::database::attempt_log_repository::AttemptLogRepository;
use payflow_backend::database::invoice_repository::InvoiceRepository;
use payflow_backend::database::payment_method_repository::PaymentMethodRepository;
use payflow_backend::database::init_pool_from_config;
use payflow_backend::gateway::drivers::paypal_express::{PaypalExpressConfig, PaypalExpressGateway};
use payflow_backend::health::HealthChecker;
use payflow_backend::logging::init_tracing;
use payflow_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use payflow_backend::services::PaymentFlow;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting payflow backend service"
    );

    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    info!(
        max_connections = db_pool.options().get_max_connections(),
        "✅ Database connection pool initialized"
    );

    let gateway_config = PaypalExpressConfig::from_env()?;
    let gateway = Arc::new(PaypalExpressGateway::new(gateway_config)?);

    let flow = Arc::new(PaymentFlow::new(
        Arc::new(InvoiceRepository::new(db_pool.clone())),
        Arc::new(PaymentMethodRepository::new(db_pool.clone())),
        Arc::new(AttemptLogRepository::new(db_pool.clone())),
        gateway,
        config.callbacks.clone(),
    ));

    let state = AppState {
        flow,
        health: HealthChecker::new(db_pool.clone()),
    };

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}
