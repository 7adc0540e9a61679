use serde::{Deserialize, Serialize};

/// Предпросмотр таблицы: строки, которые попадут в следующий запуск
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub total_rows: usize,
    pub selected_rows: usize,
    /// Номера строк, отклоненных при разборе
    #[serde(default)]
    pub malformed_lines: Vec<usize>,
    pub rows: Vec<PreviewRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    /// Номер строки в исходном файле (с 1)
    pub line: usize,
    pub sku: String,
    pub price: String,
    pub product_id: Option<String>,
    pub status: Option<String>,
}
