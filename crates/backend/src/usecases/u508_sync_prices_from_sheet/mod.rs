//! u508: перенос цен из опубликованной таблицы в каталог Shopify.
//!
//! Запуск: сессия -> проверка доступа (`shop { name }`) -> загрузка таблицы ->
//! отбор строк по статусу -> пакет строк по одной с паузой после каждого
//! обновления -> отчет.

pub mod error;
pub mod executor;
pub mod price;
pub mod report_builder;
pub mod run_history;
pub mod session;
pub mod sheet_source;
pub mod shopify_api_client;
pub mod validation;
pub mod variant_resolver;

pub use error::{CatalogError, SyncError};
pub use executor::{SyncEngine, SyncRunner, SyncSettings};
pub use run_history::RunHistoryRepository;
pub use session::{ConfigSessionProvider, DbSessionProvider, Session, SessionProvider};
pub use sheet_source::{PriceSheet, SheetSource};
pub use shopify_api_client::{CatalogApi, CatalogFactory, ShopifyApiClient, ShopifyCatalogFactory};
