use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::{ResolutionMode, RunTrigger};

/// Итог обработки одной строки таблицы.
/// На каждую обработанную строку приходится ровно один итог.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowOutcome {
    Updated { sku: String },
    Skipped { sku: String, reason: String },
    Failed { sku: String, reason: String },
}

impl RowOutcome {
    pub fn sku(&self) -> &str {
        match self {
            RowOutcome::Updated { sku }
            | RowOutcome::Skipped { sku, .. }
            | RowOutcome::Failed { sku, .. } => sku,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, RowOutcome::Updated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub sku: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRow {
    pub sku: String,
    pub reason: String,
}

/// Отчет о запуске синхронизации.
///
/// Формируется один раз в конце запуска и после этого не изменяется.
/// Порядок строк внутри каждой группы совпадает с порядком строк в таблице.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub trigger: RunTrigger,
    pub resolution_mode: ResolutionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub updated: Vec<String>,
    pub skipped: Vec<SkippedRow>,
    pub failed: Vec<FailedRow>,

    /// Строк данных в таблице (без заголовка)
    pub total_rows: usize,
    /// Строк, прошедших фильтр по статусу
    pub selected_rows: usize,
    /// Строк, реально обработанных в этом запуске
    pub processed_rows: usize,
    /// Строк за пределами пакета (останутся на следующий запуск)
    pub deferred_rows: usize,
    /// Строк, брошенных после истечения лимита времени запуска
    pub abandoned_rows: usize,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            updated: self.updated.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Short single-line summary for logs.
    pub fn summary(&self) -> String {
        let c = self.counts();
        let mut s = format!(
            "run {} ({}, {}): updated={} skipped={} failed={} processed={}/{} deferred={}",
            self.run_id,
            self.trigger,
            self.resolution_mode,
            c.updated,
            c.skipped,
            c.failed,
            self.processed_rows,
            self.selected_rows,
            self.deferred_rows,
        );
        if self.timed_out {
            s.push_str(&format!(" timed_out abandoned={}", self.abandoned_rows));
        }
        s
    }
}
