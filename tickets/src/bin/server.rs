//! Ticket sales server.
//!
//! Serves the sale and ticket lookup API and, unless `POLL_ENABLED=false`,
//! runs the invoice reconciliation loop in the background.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tickets \
//! INVOICING_EMAIL=ops@example.com INVOICING_PASSWORD=... \
//! ADMIN_PASSWORD=... \
//! cargo run --bin server
//! ```

use invoice_tickets::api::{build_router, AdminCredentials, AppState};
use invoice_tickets::notification::TicketMailer;
use invoice_tickets::providers::ConfiguredEmailProvider;
use invoice_tickets::stores::PostgresTicketStore;
use invoice_tickets::{Config, Reconciler, SaleService};
use invoice_tickets_invoicing::SessionConnector;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,invoice_tickets=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🎫 Starting ticket server...");
    invoice_tickets::metrics::register_metrics();

    let config = Config::from_env()?;
    config.validate()?;
    tracing::info!(
        bind = %config.bind_address(),
        poll_enabled = config.reconcile.enabled,
        poll_interval_secs = config.reconcile.poll_interval,
        email = ?config.email.provider,
        "Configuration loaded"
    );

    let store = PostgresTicketStore::connect(&config.database).await?;
    store.migrate().await?;
    tracing::info!("✓ Database ready");

    let connector = SessionConnector::new(config.invoicing.credentials(), config.invoicing.timeout());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconciler_task = if config.reconcile.enabled {
        let reconciler = Reconciler::new(
            connector.clone(),
            store.clone(),
            TicketMailer::new(
                ConfiguredEmailProvider::from_config(&config.email),
                config.event.ticket_base_url.clone(),
                config.event.name.clone(),
            ),
            config.reconcile.clone(),
        );
        Some(tokio::spawn(async move { reconciler.run(shutdown_rx).await }))
    } else {
        tracing::warn!("Reconciliation disabled; paid invoices will not be fulfilled");
        None
    };

    let sale = SaleService::new(
        connector.clone(),
        store.clone(),
        config.pricing.clone(),
        config.invoicing.currency.clone(),
        config.event.name.clone(),
    );
    let router = build_router(
        AppState::new(sale, store, connector),
        AdminCredentials::from_config(&config.admin),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "🎫 Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Shutting down gracefully...");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(task) = reconciler_task {
        task.await?;
    }

    tracing::info!("Stopped");
    Ok(())
}
