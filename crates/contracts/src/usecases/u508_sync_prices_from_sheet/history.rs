use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Строка истории запусков (для списка последних синхронизаций)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryEntry {
    pub run_id: String,
    pub trigger: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub updated: i64,
    pub skipped: i64,
    pub failed: i64,
    pub total_rows: i64,
    pub timed_out: bool,
}
