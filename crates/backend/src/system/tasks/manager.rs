use anyhow::Result;
use async_trait::async_trait;
use contracts::usecases::u508_sync_prices_from_sheet::RunTrigger;
use std::sync::Arc;

use super::logger::TaskLogger;

/// Трейт для менеджеров фоновых задач.
#[async_trait]
pub trait TaskManager: Send + Sync {
    /// Возвращает тип задачи, который обрабатывает этот менеджер.
    fn task_type(&self) -> &'static str;

    /// Запускает выполнение задачи.
    /// `trigger`: кто инициировал запуск (старт сервиса или расписание).
    /// `logger`: Логгер для записи хода выполнения.
    async fn run(&self, trigger: RunTrigger, logger: Arc<TaskLogger>) -> Result<()>;
}
