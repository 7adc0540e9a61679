use std::sync::Arc;

use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u508_sync_prices_from_sheet::{RunTrigger, SyncPricesFromSheet};
use price_sync::api::AppState;
use price_sync::shared::config::{self, Config, SessionSource};
use price_sync::shared::data::db;
use price_sync::system;
use price_sync::system::tasks::logger::TaskLogger;
use price_sync::usecases::u508_sync_prices_from_sheet::{
    ConfigSessionProvider, DbSessionProvider, RunHistoryRepository, SessionProvider, SheetSource,
    ShopifyCatalogFactory, SyncRunner, SyncSettings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = config::load_config()?;
    tracing::info!(
        "{} ({}), resolution mode: {}",
        SyncPricesFromSheet::display_name(),
        SyncPricesFromSheet::full_name(),
        config.sync.resolution_mode
    );
    tracing::info!("{}", SyncPricesFromSheet::description());

    let runner = Arc::new(build_runner(&config).await?);
    let task_logger = Arc::new(TaskLogger::new(system::tracing::log_directory()));

    let worker = system::tasks::initialization::initialize_scheduled_tasks(
        runner.clone(),
        task_logger.clone(),
        &config.schedule,
    )?;
    let run_on_startup = config.sync.run_on_startup;
    tokio::spawn(async move {
        if run_on_startup {
            worker.run_once(RunTrigger::Startup).await;
        }
        worker.run_loop().await;
    });

    let app = price_sync::routes::configure_routes(AppState {
        runner,
        task_logger,
    });

    let addr = config.server.bind.as_str();
    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: {} is already in use. Please ensure no other process is using this port.",
                    addr
                );
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}

/// Собирает `SyncRunner` из конфигурации: источник сессии, клиент каталога,
/// таблица и история запусков.
async fn build_runner(config: &Config) -> anyhow::Result<SyncRunner> {
    let db_path = config::get_database_path(config)?;
    let conn = db::connect(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    let sessions: Arc<dyn SessionProvider> = match config.shopify.session_source {
        SessionSource::Config => Arc::new(ConfigSessionProvider::new(&config.shopify)),
        SessionSource::Database => Arc::new(DbSessionProvider::new(conn.clone())),
    };
    let catalogs = Arc::new(ShopifyCatalogFactory::new(config.shopify.clone()));
    let sheet = Arc::new(SheetSource::new(&config.sheet)?);

    Ok(SyncRunner::new(
        SyncSettings::from(&config.sync),
        sessions,
        catalogs,
        sheet,
    )
    .with_history(RunHistoryRepository::new(conn)))
}
