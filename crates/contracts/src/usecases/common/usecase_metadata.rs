/// Метаданные UseCase: индекс, техническое имя и подпись для логов/UI
pub trait UseCaseMetadata {
    /// Индекс, например "u508"
    fn usecase_index() -> &'static str;

    /// Техническое имя, например "sync_prices_from_sheet"
    fn usecase_name() -> &'static str;

    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// "u508_sync_prices_from_sheet"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
