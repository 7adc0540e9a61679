use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

/// Открывает SQLite-базу (создает файл и директорию при необходимости)
/// и гарантирует наличие служебных таблиц.
pub async fn connect(db_file: &Path) -> anyhow::Result<DatabaseConnection> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);

    tracing::info!("Opening database: {}", absolute_path.display());
    let conn = Database::connect(&db_url).await?;
    bootstrap_schema(&conn).await?;
    Ok(conn)
}

/// Minimal schema bootstrap, idempotent.
pub async fn bootstrap_schema(conn: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    // Offline/online sessions written by the app install flow
    let create_session_table = r#"
        CREATE TABLE IF NOT EXISTS session (
            id TEXT PRIMARY KEY NOT NULL,
            shop TEXT NOT NULL,
            access_token TEXT,
            is_online INTEGER NOT NULL DEFAULT 0,
            scope TEXT,
            created_at TEXT
        );
    "#;
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        create_session_table.to_string(),
    ))
    .await?;

    let create_runs_table = r#"
        CREATE TABLE IF NOT EXISTS sys_sync_run (
            run_id TEXT PRIMARY KEY NOT NULL,
            trigger_kind TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            updated_count INTEGER NOT NULL DEFAULT 0,
            skipped_count INTEGER NOT NULL DEFAULT 0,
            failed_count INTEGER NOT NULL DEFAULT 0,
            total_rows INTEGER NOT NULL DEFAULT 0,
            timed_out INTEGER NOT NULL DEFAULT 0,
            report_json TEXT NOT NULL
        );
    "#;
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        create_runs_table.to_string(),
    ))
    .await?;

    Ok(())
}
