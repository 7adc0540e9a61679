use std::sync::{Arc, RwLock};
use std::time::Duration;

use contracts::usecases::u508_sync_prices_from_sheet::{
    ResolutionMode, RowOutcome, RunHistoryEntry, RunReport, RunTrigger, SheetPreview,
};
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use super::error::SyncError;
use super::report_builder::RunReportBuilder;
use super::run_history::RunHistoryRepository;
use super::session::SessionProvider;
use super::sheet_source::{PriceSheet, SheetRow};
use super::shopify_api_client::{CatalogApi, CatalogFactory};
use super::validation::ValidatedRow;
use super::variant_resolver::VariantResolver;
use crate::shared::config::{SyncConfig, MAX_RUN_BUDGET_SECS};

pub const REASON_VARIANT_NOT_FOUND: &str = "Variant not found";
pub const REASON_BUDGET_EXCEEDED: &str = "Run time budget exceeded";

/// Параметры запуска, собранные из секции `[sync]`
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub resolution_mode: ResolutionMode,
    pub batch_size: usize,
    pub cooldown: Duration,
    pub scoped_cap: u32,
    pub run_budget: Duration,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            resolution_mode: config.resolution_mode,
            batch_size: config.batch_size,
            cooldown: Duration::from_millis(config.cooldown_ms),
            scoped_cap: config.scoped_variant_cap,
            run_budget: Duration::from_secs(config.run_budget_secs),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Обработка пакета строк против каталога одного магазина.
///
/// Строки идут строго по очереди. Пауза `cooldown` выдерживается только после
/// успешного обновления цены и только если впереди есть еще строка.
pub struct SyncEngine<'a> {
    catalog: &'a dyn CatalogApi,
    settings: &'a SyncSettings,
}

impl<'a> SyncEngine<'a> {
    pub fn new(catalog: &'a dyn CatalogApi, settings: &'a SyncSettings) -> Self {
        Self { catalog, settings }
    }

    /// validate -> resolve -> mutate. Never returns an error: every row ends
    /// with exactly one outcome.
    pub async fn process_row(&self, row: &SheetRow) -> RowOutcome {
        let sku = row.sku.trim().to_string();

        let validated = match ValidatedRow::validate(row, self.settings.resolution_mode) {
            Ok(validated) => validated,
            Err(reason) => {
                return RowOutcome::Skipped {
                    sku,
                    reason: reason.to_string(),
                }
            }
        };

        let resolver = VariantResolver::new(
            self.catalog,
            self.settings.resolution_mode,
            self.settings.scoped_cap,
        );
        let variant = match resolver.resolve(&validated).await {
            Ok(Some(variant)) => variant,
            Ok(None) => {
                return RowOutcome::Skipped {
                    sku,
                    reason: REASON_VARIANT_NOT_FOUND.to_string(),
                }
            }
            Err(e) => {
                return RowOutcome::Failed {
                    sku,
                    reason: e.to_string(),
                }
            }
        };

        match self.catalog.update_price(&variant, &validated.price).await {
            Ok(outcome) if outcome.user_errors.is_empty() => {
                tracing::debug!(
                    "Variant {} price {} -> {}",
                    variant.id,
                    variant.current_price,
                    validated.price
                );
                RowOutcome::Updated { sku }
            }
            Ok(outcome) => RowOutcome::Failed {
                sku,
                reason: outcome.user_errors.join(", "),
            },
            Err(e) => RowOutcome::Failed {
                sku,
                reason: e.to_string(),
            },
        }
    }

    /// Обрабатывает пакет до `deadline`. При истечении лимита текущая строка
    /// помечается как `Failed`, остальные считаются брошенными.
    pub async fn run_batch(
        &self,
        rows: &[SheetRow],
        deadline: Instant,
        report: &mut RunReportBuilder,
    ) {
        let mut iter = rows.iter().enumerate().peekable();

        while let Some((index, row)) = iter.next() {
            let remaining = rows.len() - index - 1;

            let outcome = match timeout_at(deadline, self.process_row(row)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        "Run budget exceeded at line {}, {} rows abandoned",
                        row.line,
                        remaining
                    );
                    report.record(
                        row.line,
                        RowOutcome::Failed {
                            sku: row.sku.trim().to_string(),
                            reason: REASON_BUDGET_EXCEEDED.to_string(),
                        },
                    );
                    report.mark_timed_out(remaining);
                    return;
                }
            };

            log_outcome(report.run_id(), row.line, &outcome);
            let updated = outcome.is_updated();
            report.record(row.line, outcome);

            let cooldown = self.settings.cooldown;
            if updated && iter.peek().is_some() && !cooldown.is_zero() {
                if timeout_at(deadline, tokio::time::sleep(cooldown))
                    .await
                    .is_err()
                {
                    tracing::warn!("Run budget exceeded during cooldown, {} rows abandoned", remaining);
                    report.mark_timed_out(remaining);
                    return;
                }
            }
        }
    }
}

fn log_outcome(run_id: &str, line: usize, outcome: &RowOutcome) {
    let sku = outcome.sku();
    match outcome {
        RowOutcome::Updated { .. } => {
            tracing::info!(run_id = %run_id, line, sku = %sku, "Price updated")
        }
        RowOutcome::Skipped { reason, .. } => {
            tracing::info!(run_id = %run_id, line, sku = %sku, reason = %reason, "Row skipped")
        }
        RowOutcome::Failed { reason, .. } => {
            tracing::error!(run_id = %run_id, line, sku = %sku, reason = %reason, "Row failed")
        }
    }
}

/// Срок окончания запуска. Слишком большой лимит ограничивается
/// `MAX_RUN_BUDGET_SECS`, а не переполняет `Instant`.
fn run_deadline(now: Instant, budget: Duration) -> Instant {
    now.checked_add(budget)
        .unwrap_or_else(|| now + Duration::from_secs(MAX_RUN_BUDGET_SECS))
}

/// Точка входа для всех триггеров (старт, расписание, ручной запуск).
///
/// Одновременно выполняется не более одного запуска: второй триггер получает
/// `SyncError::RunInProgress`, а не ждет в очереди.
pub struct SyncRunner {
    settings: SyncSettings,
    sessions: Arc<dyn SessionProvider>,
    catalogs: Arc<dyn CatalogFactory>,
    sheet: Arc<dyn PriceSheet>,
    history: Option<RunHistoryRepository>,
    run_guard: Mutex<()>,
    last_report: RwLock<Option<RunReport>>,
}

impl SyncRunner {
    pub fn new(
        settings: SyncSettings,
        sessions: Arc<dyn SessionProvider>,
        catalogs: Arc<dyn CatalogFactory>,
        sheet: Arc<dyn PriceSheet>,
    ) -> Self {
        Self {
            settings,
            sessions,
            catalogs,
            sheet,
            history: None,
            run_guard: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    pub fn with_history(mut self, history: RunHistoryRepository) -> Self {
        self.history = Some(history);
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Запустить синхронизацию
    pub async fn run(&self, trigger: RunTrigger) -> Result<RunReport, SyncError> {
        let _guard = self.run_guard.try_lock().map_err(|_| {
            tracing::warn!("Sync run ({}) rejected: another run is in progress", trigger);
            SyncError::RunInProgress
        })?;

        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, trigger = %trigger, "Starting price sync");

        let report = match self.execute(run_id.clone(), trigger).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(run_id = %run_id, "Price sync aborted: {}", e);
                return Err(e);
            }
        };

        if report.has_failures() {
            tracing::warn!("{}", report.summary());
        } else {
            tracing::info!("{}", report.summary());
        }

        if let Some(history) = &self.history {
            if let Err(e) = history.save(&report).await {
                tracing::error!("Failed to save run history for {}: {}", report.run_id, e);
            }
        }
        if let Ok(mut last) = self.last_report.write() {
            *last = Some(report.clone());
        }

        Ok(report)
    }

    async fn execute(&self, run_id: String, trigger: RunTrigger) -> Result<RunReport, SyncError> {
        let deadline = run_deadline(Instant::now(), self.settings.run_budget);

        // Проверка доступа до чтения таблицы
        let session = self.sessions.get_session().await?;
        let catalog = self.catalogs.create(&session)?;
        let shop_name = catalog.shop_name().await?;
        tracing::info!("Authorized for shop '{}' ({})", shop_name, session.shop);

        let sheet = self.sheet.load().await?;
        let selected = sheet.select(self.sheet.status_marker());
        let batch_len = selected.len().min(self.settings.batch_size);
        let deferred = selected.len() - batch_len;

        tracing::info!(
            "Price sheet: {} rows, {} selected, {} in this batch",
            sheet.total_rows(),
            selected.len(),
            batch_len
        );
        if deferred > 0 {
            tracing::info!("{} selected rows deferred to the next run", deferred);
        }

        let mut report = RunReportBuilder::new(run_id, trigger, self.settings.resolution_mode);
        report.set_source_counts(sheet.total_rows(), selected.len(), deferred);

        // Отклоненные строки не имеют статуса, поэтому попадают в отчет всегда
        for malformed in &sheet.malformed {
            let outcome = RowOutcome::Skipped {
                sku: String::new(),
                reason: malformed.reason(),
            };
            log_outcome(report.run_id(), malformed.line, &outcome);
            report.record(malformed.line, outcome);
        }

        let engine = SyncEngine::new(catalog.as_ref(), &self.settings);
        engine
            .run_batch(&selected[..batch_len], deadline, &mut report)
            .await;

        Ok(report.finish())
    }

    /// Строки, которые взял бы следующий запуск. Каталог не трогает.
    pub async fn preview(&self) -> Result<SheetPreview, SyncError> {
        let sheet = self.sheet.load().await?;
        Ok(sheet.preview(self.sheet.status_marker()))
    }

    pub fn last_report(&self) -> Option<RunReport> {
        self.last_report.read().ok().and_then(|last| last.clone())
    }

    pub async fn recent_runs(&self, limit: u64) -> Result<Vec<RunHistoryEntry>, SyncError> {
        match &self.history {
            Some(history) => history
                .list_recent(limit)
                .await
                .map_err(|e| SyncError::Storage(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    /// Отчет по id: из истории, иначе последний отчет в памяти
    pub async fn find_report(&self, run_id: &str) -> Result<Option<RunReport>, SyncError> {
        if let Some(history) = &self.history {
            let stored = history
                .get_report(run_id)
                .await
                .map_err(|e| SyncError::Storage(e.to_string()))?;
            if stored.is_some() {
                return Ok(stored);
            }
        }
        Ok(self.last_report().filter(|report| report.run_id == run_id))
    }
}
