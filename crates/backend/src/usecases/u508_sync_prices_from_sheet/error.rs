use contracts::usecases::common::UseCaseError;
use thiserror::Error;

/// Ошибки обращения к каталогу (Shopify Admin API)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("API error (status {status}): {}", .errors.join(", "))]
    Api { status: u16, errors: Vec<String> },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Transport(err.to_string())
        }
    }
}

/// Ошибки уровня запуска синхронизации.
///
/// Все варианты, кроме `Catalog`, возникающего внутри строки, прерывают запуск
/// до обработки первой строки.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No offline session found. Install or re-authorize the app.")]
    NoSessionFound,

    #[error("Price sheet unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Price sheet has no data rows")]
    SourceEmpty,

    #[error("Another sync run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sea_orm::DbErr> for SyncError {
    fn from(err: sea_orm::DbErr) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<SyncError> for UseCaseError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::NoSessionFound => UseCaseError::new("NO_SESSION", message),
            SyncError::SourceUnavailable(_) => UseCaseError::external(message),
            SyncError::SourceEmpty => UseCaseError::validation(message),
            SyncError::RunInProgress => UseCaseError::new("RUN_IN_PROGRESS", message),
            SyncError::Catalog(CatalogError::Api { status, .. }) => {
                UseCaseError::external(message).with_details(format!("HTTP status {}", status))
            }
            SyncError::Catalog(_) => UseCaseError::external(message),
            SyncError::Storage(_) => UseCaseError::internal(message),
        }
    }
}
