pub mod handlers;

use std::sync::Arc;

use crate::system::tasks::logger::TaskLogger;
use crate::usecases::u508_sync_prices_from_sheet::SyncRunner;

/// Общее состояние для обработчиков
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SyncRunner>,
    pub task_logger: Arc<TaskLogger>,
}
