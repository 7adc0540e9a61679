use contracts::usecases::u508_sync_prices_from_sheet::ResolutionMode;

use super::price::Price;
use super::sheet_source::SheetRow;

pub const REASON_MISSING_DATA: &str = "Missing data";

/// Строка, прошедшая проверку: sku и цена заполнены, product id есть
/// (если включен поиск в пределах товара).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    pub line: usize,
    pub sku: String,
    pub price: Price,
    pub product_id: Option<String>,
}

impl ValidatedRow {
    /// Returns the skip reason on failure. Never touches the network.
    pub fn validate(row: &SheetRow, mode: ResolutionMode) -> Result<Self, &'static str> {
        let sku = row.sku.trim();
        let product_id = row
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if sku.is_empty() || (mode == ResolutionMode::Scoped && product_id.is_none()) {
            return Err(REASON_MISSING_DATA);
        }

        let Some(price) = Price::parse(&row.price) else {
            return Err(REASON_MISSING_DATA);
        };

        Ok(Self {
            line: row.line,
            sku: sku.to_string(),
            price,
            product_id: product_id.map(str::to_string),
        })
    }
}
