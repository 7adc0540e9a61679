use chrono::{DateTime, Utc};
use contracts::usecases::u508_sync_prices_from_sheet::{RunHistoryEntry, RunReport};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

/// История запусков в таблице `sys_sync_run`
#[derive(Clone)]
pub struct RunHistoryRepository {
    db: DatabaseConnection,
}

impl RunHistoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn save(&self, report: &RunReport) -> anyhow::Result<()> {
        let counts = report.counts();
        let report_json = serde_json::to_string(report)?;
        let sql = r#"
            INSERT INTO sys_sync_run
                (run_id, trigger_kind, started_at, finished_at,
                 updated_count, skipped_count, failed_count, total_rows, timed_out, report_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            vec![
                report.run_id.clone().into(),
                report.trigger.to_string().into(),
                report.started_at.to_rfc3339().into(),
                report.finished_at.to_rfc3339().into(),
                (counts.updated as i64).into(),
                (counts.skipped as i64).into(),
                (counts.failed as i64).into(),
                (report.total_rows as i64).into(),
                report.timed_out.into(),
                report_json.into(),
            ],
        );
        self.db.execute(stmt).await?;
        Ok(())
    }

    /// Newest first
    pub async fn list_recent(&self, limit: u64) -> anyhow::Result<Vec<RunHistoryEntry>> {
        let sql = r#"
            SELECT run_id, trigger_kind, started_at, finished_at,
                   updated_count, skipped_count, failed_count, total_rows, timed_out
            FROM sys_sync_run
            ORDER BY started_at DESC
            LIMIT ?
        "#;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            sql,
            vec![(limit as i64).into()],
        );

        let rows = self.db.query_all(stmt).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let started_at: String = row.try_get("", "started_at")?;
            let finished_at: String = row.try_get("", "finished_at")?;
            entries.push(RunHistoryEntry {
                run_id: row.try_get("", "run_id")?,
                trigger: row.try_get("", "trigger_kind")?,
                started_at: parse_timestamp(&started_at)?,
                finished_at: parse_timestamp(&finished_at)?,
                updated: row.try_get("", "updated_count")?,
                skipped: row.try_get("", "skipped_count")?,
                failed: row.try_get("", "failed_count")?,
                total_rows: row.try_get("", "total_rows")?,
                timed_out: row.try_get("", "timed_out")?,
            });
        }
        Ok(entries)
    }

    /// Full report of a past run
    pub async fn get_report(&self, run_id: &str) -> anyhow::Result<Option<RunReport>> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT report_json FROM sys_sync_run WHERE run_id = ?",
            vec![run_id.into()],
        );
        match self.db.query_one(stmt).await? {
            Some(row) => {
                let json: String = row.try_get("", "report_json")?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}

fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
