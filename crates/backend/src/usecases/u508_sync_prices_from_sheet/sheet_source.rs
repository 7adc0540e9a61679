//! Загрузка и разбор таблицы цен.
//!
//! Формат: текст с разделителем `;`, первая непустая строка является заголовком.
//! Одна запись занимает ровно одну строку текста. Кавычки разбираются по
//! правилам CSV (`"a;b"` это одно поле, `""` внутри кавычек превращается в `"`).
//! Строка с незакрытой кавычкой не склеивается со следующими: она попадает
//! в `ParsedSheet::malformed` и получает свой итог в отчете.

use std::time::Duration;

use async_trait::async_trait;
use contracts::usecases::u508_sync_prices_from_sheet::{PreviewRow, SheetPreview};

use super::error::SyncError;
use crate::shared::config::SheetConfig;

const DELIMITER: u8 = b';';

/// Одна строка данных таблицы в исходном виде
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// Номер строки в исходном тексте (с 1)
    pub line: usize,
    pub sku: String,
    pub price: String,
    pub product_id: Option<String>,
    pub status_flag: Option<String>,
}

/// Names of the columns in the header row. Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub sku: String,
    pub price: String,
    pub product_id: String,
    pub status: String,
}

impl SheetLayout {
    pub fn from_config(config: &SheetConfig) -> Self {
        Self {
            sku: config.sku_column.clone(),
            price: config.price_column.clone(),
            product_id: config.product_id_column.clone(),
            status: config.status_column.clone(),
        }
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self::from_config(&SheetConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    sku: usize,
    price: usize,
    product_id: Option<usize>,
    status: Option<usize>,
}

impl ColumnIndex {
    const POSITIONAL: ColumnIndex = ColumnIndex {
        sku: 0,
        price: 1,
        product_id: Some(2),
        status: Some(3),
    };

    /// Named columns when the header has both sku and price, positional otherwise.
    fn resolve(header: &csv::StringRecord, layout: &SheetLayout) -> Self {
        let find = |name: &str| {
            let name = name.trim();
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        match (find(&layout.sku), find(&layout.price)) {
            (Some(sku), Some(price)) => ColumnIndex {
                sku,
                price,
                product_id: find(&layout.product_id),
                status: find(&layout.status),
            },
            _ => Self::POSITIONAL,
        }
    }
}

/// Строка, которую не удалось разобрать
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    pub line: usize,
    pub message: String,
}

impl MalformedRow {
    pub fn reason(&self) -> String {
        format!("Malformed line {}", self.line)
    }
}

/// Результат разбора: строки данных в исходном порядке и отклоненные строки
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub rows: Vec<SheetRow>,
    pub malformed: Vec<MalformedRow>,
}

impl ParsedSheet {
    /// Data lines below the header, malformed ones included.
    pub fn total_rows(&self) -> usize {
        self.rows.len() + self.malformed.len()
    }

    /// Rows flagged for update. `None` keeps every row.
    pub fn select(&self, marker: Option<&str>) -> Vec<SheetRow> {
        match marker {
            None => self.rows.clone(),
            Some(marker) => self
                .rows
                .iter()
                .filter(|row| {
                    row.status_flag
                        .as_deref()
                        .is_some_and(|flag| flag.trim().eq_ignore_ascii_case(marker.trim()))
                })
                .cloned()
                .collect(),
        }
    }

    pub fn preview(&self, marker: Option<&str>) -> SheetPreview {
        let selected = self.select(marker);
        SheetPreview {
            total_rows: self.total_rows(),
            selected_rows: selected.len(),
            malformed_lines: self.malformed.iter().map(|m| m.line).collect(),
            rows: selected
                .into_iter()
                .map(|row| PreviewRow {
                    line: row.line,
                    sku: row.sku,
                    price: row.price,
                    product_id: row.product_id,
                    status: row.status_flag,
                })
                .collect(),
        }
    }
}

/// Разбирает текст таблицы.
///
/// `SourceEmpty` только если не осталось ни одной пригодной строки данных.
pub fn parse(raw: &str, layout: &SheetLayout) -> Result<ParsedSheet, SyncError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut columns: Option<ColumnIndex> = None;
    let mut sheet = ParsedSheet::default();

    for (index, text) in raw.lines().enumerate() {
        let line = index + 1;
        if text.trim().is_empty() {
            continue;
        }

        let record = match split_line(text) {
            Ok(record) => record,
            Err(message) => {
                tracing::warn!("Price sheet line {} rejected: {}", line, message);
                sheet.malformed.push(MalformedRow { line, message });
                continue;
            }
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let Some(columns) = columns else {
            columns = Some(ColumnIndex::resolve(&record, layout));
            continue;
        };

        sheet.rows.push(SheetRow {
            line,
            sku: field(&record, Some(columns.sku)).unwrap_or_default(),
            price: field(&record, Some(columns.price)).unwrap_or_default(),
            product_id: field(&record, columns.product_id),
            status_flag: field(&record, columns.status),
        });
    }

    if sheet.rows.is_empty() {
        return Err(SyncError::SourceEmpty);
    }

    tracing::debug!(
        "Parsed {} data rows from price sheet, {} malformed",
        sheet.rows.len(),
        sheet.malformed.len()
    );
    Ok(sheet)
}

/// Одна строка текста в поля.
fn split_line(text: &str) -> Result<csv::StringRecord, String> {
    if has_open_quote(text) {
        return Err("unterminated quoted field".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    match reader.records().next() {
        Some(record) => record.map_err(|e| e.to_string()),
        None => Ok(csv::StringRecord::new()),
    }
}

/// Кавычка открывает поле только в его начале; `""` внутри кавычек экранирует.
fn has_open_quote(text: &str) -> bool {
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        match c {
            ';' => at_field_start = true,
            '"' if at_field_start => {
                in_quotes = true;
                at_field_start = false;
            }
            c if c.is_whitespace() => {}
            _ => at_field_start = false,
        }
    }

    in_quotes
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// HTTP-клиент для выгрузки таблицы
pub struct SheetSource {
    client: reqwest::Client,
    url: String,
    layout: SheetLayout,
    status_marker: Option<String>,
}

impl SheetSource {
    pub fn new(config: &SheetConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.trim().to_string(),
            layout: SheetLayout::from_config(config),
            status_marker: config
                .status_filter
                .then(|| config.status_marker.clone()),
        })
    }

    /// Скачивает сырой текст таблицы
    pub async fn fetch(&self) -> Result<String, SyncError> {
        if self.url.is_empty() {
            return Err(SyncError::SourceUnavailable(
                "sheet.url is not configured".to_string(),
            ));
        }

        tracing::info!("Downloading price sheet: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Price sheet request failed with status {}", status);
            return Err(SyncError::SourceUnavailable(format!(
                "HTTP status {}",
                status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))
    }

}

/// Источник строк для запуска синхронизации
#[async_trait]
pub trait PriceSheet: Send + Sync {
    /// Маркер статуса для отбора строк; `None` означает все строки
    fn status_marker(&self) -> Option<&str>;

    async fn load(&self) -> Result<ParsedSheet, SyncError>;
}

#[async_trait]
impl PriceSheet for SheetSource {
    fn status_marker(&self) -> Option<&str> {
        self.status_marker.as_deref()
    }

    async fn load(&self) -> Result<ParsedSheet, SyncError> {
        let raw = self.fetch().await?;
        parse(&raw, &self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn layout() -> SheetLayout {
        SheetLayout::default()
    }

    #[test]
    fn test_parse_positional_columns() {
        let raw = "sku;price;product;status\n\"SKU1\";\"9.99\";111;u\nSKU2;;222;u\n";
        let sheet = parse(raw, &layout()).unwrap();

        assert_eq!(sheet.total_rows(), 2);
        assert_eq!(
            sheet.rows[0],
            SheetRow {
                line: 2,
                sku: "SKU1".into(),
                price: "9.99".into(),
                product_id: Some("111".into()),
                status_flag: Some("u".into()),
            }
        );
        assert_eq!(sheet.rows[1].price, "");
        assert_eq!(sheet.rows[1].product_id.as_deref(), Some("222"));
    }

    #[test]
    fn test_parse_named_columns_any_order() {
        let raw = "Status;Internal Product ID;Recommended Price;Product SKU\nu;111;10.50;A-1\n";
        let sheet = parse(raw, &layout()).unwrap();
        let row = &sheet.rows[0];
        assert_eq!(row.sku, "A-1");
        assert_eq!(row.price, "10.50");
        assert_eq!(row.product_id.as_deref(), Some("111"));
        assert_eq!(row.status_flag.as_deref(), Some("u"));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_header() {
        let raw = "\n\n  \nsku;price\n\nSKU1;1\n   \nSKU2;2\r\n";
        let sheet = parse(raw, &layout()).unwrap();
        let skus: Vec<_> = sheet.rows.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["SKU1", "SKU2"]);
        assert_eq!(sheet.rows[0].product_id, None);
        assert_eq!(sheet.rows[0].status_flag, None);
    }

    #[test]
    fn test_parse_quoted_delimiter_and_escape() {
        let raw = "sku;price\n\"A;B\";\"1\"\n\"say \"\"hi\"\"\";2\n";
        let sheet = parse(raw, &layout()).unwrap();
        assert_eq!(sheet.rows[0].sku, "A;B");
        assert_eq!(sheet.rows[1].sku, "say \"hi\"");
    }

    #[test]
    fn test_parse_strips_bom() {
        let raw = "\u{feff}product sku;recommended price\nX;3\n";
        let sheet = parse(raw, &layout()).unwrap();
        assert_eq!(sheet.rows[0].sku, "X");
        assert_eq!(sheet.rows[0].price, "3");
    }

    #[test]
    fn test_parse_header_only_is_empty() {
        assert!(matches!(
            parse("sku;price\n\n", &layout()),
            Err(SyncError::SourceEmpty)
        ));
        assert!(matches!(parse("", &layout()), Err(SyncError::SourceEmpty)));
    }

    #[test]
    fn test_unterminated_quote_rejects_only_its_line() {
        let raw = "sku;price;pid;status\nA;1;1;u\n\"B;2;1;u\nC;3;1;u\n";
        let sheet = parse(raw, &layout()).unwrap();

        let skus: Vec<_> = sheet.rows.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["A", "C"]);
        assert_eq!(sheet.rows[1].line, 4);
        assert_eq!(
            sheet.malformed,
            vec![MalformedRow {
                line: 3,
                message: "unterminated quoted field".into()
            }]
        );
        assert_eq!(sheet.malformed[0].reason(), "Malformed line 3");
        assert_eq!(sheet.total_rows(), 3);
    }

    #[test]
    fn test_unterminated_quote_on_last_line_without_newline() {
        let raw = "sku;price;pid;status\nA;1;1;u\n\"B;2;1;u";
        let sheet = parse(raw, &layout()).unwrap();

        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.malformed[0].line, 3);
        assert_eq!(sheet.preview(Some("u")).malformed_lines, vec![3]);
    }

    #[test]
    fn test_quote_state_tracking() {
        assert!(!has_open_quote("\"A;B\";1"));
        assert!(!has_open_quote("\"say \"\"hi\"\"\";2"));
        assert!(!has_open_quote("12\" screen;5"));
        assert!(!has_open_quote("A; \"quoted\" ;1"));
        assert!(has_open_quote("A;\"1"));
        assert!(has_open_quote("\"ends with escaped \"\""));
    }

    #[test]
    fn test_only_malformed_lines_is_empty() {
        let raw = "sku;price\n\"A;1\n";
        assert!(matches!(parse(raw, &layout()), Err(SyncError::SourceEmpty)));
    }

    #[test]
    fn test_select_by_status() {
        let raw = "sku;price;pid;status\nA;1;1;u\nB;2;2;\nC;3;3; U \nD;4;4;done\n";
        let sheet = parse(raw, &layout()).unwrap();

        let selected: Vec<_> = sheet
            .select(Some("u"))
            .into_iter()
            .map(|r| r.sku)
            .collect();
        assert_eq!(selected, vec!["A", "C"]);
        assert_eq!(sheet.select(None).len(), 4);

        let preview = sheet.preview(Some("u"));
        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.selected_rows, 2);
        assert_eq!(preview.rows[1].line, 4);
    }

    #[tokio::test]
    async fn test_fetch_ok_and_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("sku;price\nA;1\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.csv"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut config = SheetConfig {
            url: format!("{}/ok.csv", server.uri()),
            ..SheetConfig::default()
        };
        let sheet = SheetSource::new(&config).unwrap().load().await.unwrap();
        assert_eq!(sheet.rows[0].sku, "A");

        config.url = format!("{}/missing.csv", server.uri());
        let err = SheetSource::new(&config).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("sku;price\nA;1\n")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = SheetConfig {
            url: format!("{}/slow.csv", server.uri()),
            timeout_secs: 1,
            ..SheetConfig::default()
        };
        let err = SheetSource::new(&config).unwrap().fetch().await.unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_without_url() {
        let source = SheetSource::new(&SheetConfig::default()).unwrap();
        assert!(matches!(
            source.fetch().await,
            Err(SyncError::SourceUnavailable(_))
        ));
        assert_eq!(source.status_marker(), Some("u"));
    }
}
