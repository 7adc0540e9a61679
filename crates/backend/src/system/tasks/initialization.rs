use anyhow::Result;
use std::sync::Arc;

use crate::shared::config::ScheduleConfig;
use crate::usecases::u508_sync_prices_from_sheet::SyncRunner;

use super::{logger::TaskLogger, managers::U508SyncPricesManager, worker::ScheduledTaskWorker};

/// Создает воркер синхронизации цен. Расписание подключается, только если
/// оно включено в конфигурации.
pub fn initialize_scheduled_tasks(
    runner: Arc<SyncRunner>,
    logger: Arc<TaskLogger>,
    schedule: &ScheduleConfig,
) -> Result<ScheduledTaskWorker> {
    let manager = Arc::new(U508SyncPricesManager::new(runner));
    let worker = ScheduledTaskWorker::new(manager, logger);

    if schedule.enabled {
        tracing::info!("Price sync schedule: '{}'", schedule.cron);
        worker.with_schedule(&schedule.cron)
    } else {
        tracing::info!("Price sync schedule disabled");
        Ok(worker)
    }
}
