use anyhow::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Логгер для записи хода запуска синхронизации в файл.
/// Каждый лог-файл привязан к одному запуску (`run_id`).
pub struct TaskLogger {
    log_dir: PathBuf,
}

impl TaskLogger {
    pub fn new(base_log_dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: base_log_dir.as_ref().join("task_logs"),
        }
    }

    /// Возвращает путь к лог-файлу для данного запуска.
    pub fn log_file_path(&self, run_id: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", run_id))
    }

    /// Дописывает строку с отметкой времени. Файл и директория создаются
    /// при первой записи.
    pub fn write_log(&self, run_id: &str, message: &str) -> Result<()> {
        fs::create_dir_all(&self.log_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file_path(run_id))?;

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    /// `None`, если лога для запуска нет.
    pub fn read_log(&self, run_id: &str) -> Result<Option<String>> {
        // run_id приходит из URL
        if run_id.is_empty() || run_id.contains(['/', '\\', '.']) {
            return Ok(None);
        }
        let path = self.log_file_path(run_id);
        if path.exists() {
            Ok(Some(fs::read_to_string(path)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TaskLogger::new(dir.path());

        logger.write_log("run-1", "first").unwrap();
        logger.write_log("run-1", "second").unwrap();

        let content = logger.read_log("run-1").unwrap().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
        assert!(dir.path().join("task_logs").join("run-1.log").exists());
    }

    #[test]
    fn test_read_missing_or_suspicious_id() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TaskLogger::new(dir.path());

        assert!(logger.read_log("nope").unwrap().is_none());
        assert!(logger.read_log("../secret").unwrap().is_none());
        assert!(logger.read_log("").unwrap().is_none());
    }
}
