use chrono::{DateTime, Utc};
use contracts::usecases::u508_sync_prices_from_sheet::{
    FailedRow, ResolutionMode, RowOutcome, RunReport, RunTrigger, SkippedRow,
};

/// Накопитель итогов запуска. `finish` забирает накопитель целиком, поэтому
/// готовый `RunReport` больше никто не изменяет.
///
/// Итоги хранятся с номером строки таблицы: внутри каждой группы отчета
/// строки идут в порядке таблицы, даже если записаны не по порядку.
#[derive(Debug)]
pub struct RunReportBuilder {
    run_id: String,
    trigger: RunTrigger,
    resolution_mode: ResolutionMode,
    started_at: DateTime<Utc>,
    outcomes: Vec<(usize, RowOutcome)>,
    total_rows: usize,
    selected_rows: usize,
    deferred_rows: usize,
    abandoned_rows: usize,
    timed_out: bool,
}

impl RunReportBuilder {
    pub fn new(run_id: String, trigger: RunTrigger, resolution_mode: ResolutionMode) -> Self {
        Self {
            run_id,
            trigger,
            resolution_mode,
            started_at: Utc::now(),
            outcomes: Vec::new(),
            total_rows: 0,
            selected_rows: 0,
            deferred_rows: 0,
            abandoned_rows: 0,
            timed_out: false,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn set_source_counts(&mut self, total_rows: usize, selected_rows: usize, deferred_rows: usize) {
        self.total_rows = total_rows;
        self.selected_rows = selected_rows;
        self.deferred_rows = deferred_rows;
    }

    pub fn mark_timed_out(&mut self, abandoned_rows: usize) {
        self.timed_out = true;
        self.abandoned_rows = abandoned_rows;
    }

    pub fn record(&mut self, line: usize, outcome: RowOutcome) {
        self.outcomes.push((line, outcome));
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn finish(mut self) -> RunReport {
        let processed_rows = self.processed();
        self.outcomes.sort_by_key(|(line, _)| *line);

        let mut updated = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        for (_, outcome) in self.outcomes {
            match outcome {
                RowOutcome::Updated { sku } => updated.push(sku),
                RowOutcome::Skipped { sku, reason } => skipped.push(SkippedRow { sku, reason }),
                RowOutcome::Failed { sku, reason } => failed.push(FailedRow { sku, reason }),
            }
        }

        RunReport {
            run_id: self.run_id,
            trigger: self.trigger,
            resolution_mode: self.resolution_mode,
            started_at: self.started_at,
            finished_at: Utc::now(),
            updated,
            skipped,
            failed,
            total_rows: self.total_rows,
            selected_rows: self.selected_rows,
            processed_rows,
            deferred_rows: self.deferred_rows,
            abandoned_rows: self.abandoned_rows,
            timed_out: self.timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_keep_input_order() {
        let mut builder =
            RunReportBuilder::new("r".into(), RunTrigger::Schedule, ResolutionMode::Scoped);
        builder.set_source_counts(10, 4, 0);
        builder.record(
            3,
            RowOutcome::Skipped {
                sku: "B".into(),
                reason: "Missing data".into(),
            },
        );
        builder.record(2, RowOutcome::Updated { sku: "A".into() });
        builder.record(4, RowOutcome::Updated { sku: "C".into() });
        builder.record(
            5,
            RowOutcome::Failed {
                sku: "D".into(),
                reason: "boom".into(),
            },
        );
        // разобранная с ошибкой строка записывается раньше остальных
        builder.record(
            1,
            RowOutcome::Skipped {
                sku: "".into(),
                reason: "Malformed line 1".into(),
            },
        );

        let report = builder.finish();
        assert_eq!(report.updated, vec!["A", "C"]);
        assert_eq!(report.skipped[0].reason, "Malformed line 1");
        assert_eq!(report.skipped[1].sku, "B");
        assert_eq!(report.failed[0].reason, "boom");
        assert_eq!(report.processed_rows, 5);
        assert_eq!(report.total_rows, 10);
        assert!(!report.timed_out);
        assert!(report.finished_at >= report.started_at);
    }
}
