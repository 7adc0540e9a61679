use std::fmt;

/// Цена в виде десятичной строки.
///
/// Цена никогда не переводится в `f64`: в каталог уходит та же строка, что
/// пришла из таблицы (после нормализации разделителя дроби). Формат числа
/// проверяет сам каталог и возвращает `userErrors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price(String);

impl Price {
    /// `None` for an empty cell. `5309,00` becomes `5309.00`, anything else
    /// is kept as written.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        // "5309,00" from spreadsheets with a comma decimal separator
        let normalized = if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
            trimmed.replace(',', ".")
        } else {
            trimmed.to_string()
        };

        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> Option<String> {
        Price::parse(raw).map(|p| p.as_str().to_string())
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parsed("9.99").as_deref(), Some("9.99"));
        assert_eq!(parsed(" 120 ").as_deref(), Some("120"));
        assert_eq!(parsed("5309,00").as_deref(), Some("5309.00"));
        assert_eq!(parsed("-1.5").as_deref(), Some("-1.5"));
    }

    #[test]
    fn test_parse_keeps_exact_digits() {
        // 0.1 + 0.2 style drift must not appear
        assert_eq!(Price::parse("0.30").unwrap().to_string(), "0.30");
        assert_eq!(
            parsed("19999999999.990001").as_deref(),
            Some("19999999999.990001")
        );
    }

    #[test]
    fn test_empty_is_none() {
        assert_eq!(Price::parse(""), None);
        assert_eq!(Price::parse("   "), None);
    }

    #[test]
    fn test_non_numeric_passed_through() {
        assert_eq!(parsed("n/a").as_deref(), Some("n/a"));
        assert_eq!(parsed("5.").as_deref(), Some("5."));
        assert_eq!(parsed("1,234.50").as_deref(), Some("1,234.50"));
        assert_eq!(parsed("1,2,3").as_deref(), Some("1,2,3"));
    }
}
