pub mod history;
pub mod preview;
pub mod report;
pub mod request;

pub use history::RunHistoryEntry;
pub use preview::{PreviewRow, SheetPreview};
pub use report::{FailedRow, RowOutcome, RunCounts, RunReport, SkippedRow};
pub use request::{ResolutionMode, RunTrigger};

use crate::usecases::common::UseCaseMetadata;

pub struct SyncPricesFromSheet;

impl UseCaseMetadata for SyncPricesFromSheet {
    fn usecase_index() -> &'static str {
        "u508"
    }

    fn usecase_name() -> &'static str {
        "sync_prices_from_sheet"
    }

    fn display_name() -> &'static str {
        "Синхронизация цен из таблицы"
    }

    fn description() -> &'static str {
        "Перенос цен из опубликованной таблицы (CSV, разделитель ;) в каталог Shopify по SKU"
    }
}
