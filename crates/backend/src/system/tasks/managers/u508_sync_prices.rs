use anyhow::Result;
use async_trait::async_trait;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u508_sync_prices_from_sheet::{RunReport, RunTrigger, SyncPricesFromSheet};
use std::sync::Arc;

use crate::system::tasks::logger::TaskLogger;
use crate::system::tasks::manager::TaskManager;
use crate::usecases::u508_sync_prices_from_sheet::SyncRunner;

/// Менеджер для задачи синхронизации цен из таблицы (u508)
pub struct U508SyncPricesManager {
    runner: Arc<SyncRunner>,
}

impl U508SyncPricesManager {
    pub fn new(runner: Arc<SyncRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TaskManager for U508SyncPricesManager {
    fn task_type(&self) -> &'static str {
        SyncPricesFromSheet::usecase_name()
    }

    async fn run(&self, trigger: RunTrigger, logger: Arc<TaskLogger>) -> Result<()> {
        let report = self.runner.run(trigger).await?;
        write_report(&logger, &report)?;
        Ok(())
    }
}

/// По строке на каждый итог, затем сводка
pub fn write_report(logger: &TaskLogger, report: &RunReport) -> Result<()> {
    let run_id = &report.run_id;
    logger.write_log(
        run_id,
        &format!(
            "U508 price sync ({}, {}), started {}",
            report.trigger,
            report.resolution_mode,
            report.started_at.format("%Y-%m-%d %H:%M:%S")
        ),
    )?;

    for sku in &report.updated {
        logger.write_log(run_id, &format!("UPDATED {}", sku))?;
    }
    for row in &report.skipped {
        logger.write_log(run_id, &format!("SKIPPED {}: {}", row.sku, row.reason))?;
    }
    for row in &report.failed {
        logger.write_log(run_id, &format!("FAILED {}: {}", row.sku, row.reason))?;
    }

    logger.write_log(run_id, &report.summary())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::usecases::u508_sync_prices_from_sheet::{
        FailedRow, ResolutionMode, SkippedRow,
    };

    #[test]
    fn test_write_report_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TaskLogger::new(dir.path());
        let now = Utc::now();
        let report = RunReport {
            run_id: "abc".to_string(),
            trigger: RunTrigger::Schedule,
            resolution_mode: ResolutionMode::Scoped,
            started_at: now,
            finished_at: now,
            updated: vec!["SKU1".to_string()],
            skipped: vec![SkippedRow {
                sku: "SKU2".to_string(),
                reason: "Missing data".to_string(),
            }],
            failed: vec![FailedRow {
                sku: "SKU3".to_string(),
                reason: "Price can't be negative".to_string(),
            }],
            total_rows: 3,
            selected_rows: 3,
            processed_rows: 3,
            deferred_rows: 0,
            abandoned_rows: 0,
            timed_out: false,
        };

        write_report(&logger, &report).unwrap();

        let log = logger.read_log("abc").unwrap().unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].ends_with("UPDATED SKU1"));
        assert!(lines[2].ends_with("SKIPPED SKU2: Missing data"));
        assert!(lines[3].ends_with("FAILED SKU3: Price can't be negative"));
        assert!(lines[4].contains("updated=1 skipped=1 failed=1"));
    }
}
