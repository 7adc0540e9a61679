use anyhow::Result;
use chrono::{DateTime, Utc};
use contracts::usecases::u508_sync_prices_from_sheet::RunTrigger;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{logger::TaskLogger, manager::TaskManager};
use crate::usecases::u508_sync_prices_from_sheet::SyncError;

/// Фоновый воркер: запускает задачу по cron-расписанию.
///
/// Запуски идут последовательно. Если запуск длится дольше интервала,
/// пропущенные срабатывания не догоняются.
pub struct ScheduledTaskWorker {
    manager: Arc<dyn TaskManager>,
    logger: Arc<TaskLogger>,
    schedule: Option<Schedule>,
}

impl ScheduledTaskWorker {
    pub fn new(manager: Arc<dyn TaskManager>, logger: Arc<TaskLogger>) -> Self {
        Self {
            manager,
            logger,
            schedule: None,
        }
    }

    pub fn with_schedule(mut self, cron_expr: &str) -> Result<Self> {
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| anyhow::anyhow!("Invalid cron expression '{}': {}", cron_expr, e))?;
        self.schedule = Some(schedule);
        Ok(self)
    }

    pub fn next_run_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.as_ref()?.after(&after).next()
    }

    /// Запускает цикл по расписанию. Без расписания сразу возвращается.
    pub async fn run_loop(&self) {
        if self.schedule.is_none() {
            info!("Schedule for '{}' is disabled", self.manager.task_type());
            return;
        }
        info!("Scheduled task worker started for '{}'", self.manager.task_type());

        loop {
            let now = Utc::now();
            let Some(next) = self.next_run_after(now) else {
                warn!("Cron schedule has no upcoming runs, worker stopped");
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            self.run_once(RunTrigger::Schedule).await;
        }
    }

    /// Один запуск задачи. Возвращает `true`, если задача отработала.
    pub async fn run_once(&self, trigger: RunTrigger) -> bool {
        let task_type = self.manager.task_type();
        match self.manager.run(trigger, Arc::clone(&self.logger)).await {
            Ok(()) => {
                info!("Task '{}' ({}) completed", task_type, trigger);
                true
            }
            Err(e) if matches!(e.downcast_ref::<SyncError>(), Some(SyncError::RunInProgress)) => {
                info!(
                    "Task '{}' ({}) skipped: previous run still in progress",
                    task_type, trigger
                );
                false
            }
            Err(e) => {
                error!("Task '{}' ({}) failed: {}", task_type, trigger, e);
                false
            }
        }
    }
}
