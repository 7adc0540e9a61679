use serde::{Deserialize, Serialize};
use std::fmt;

/// Кто инициировал запуск
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    /// Однократный запуск при старте процесса
    Startup,

    /// Очередной тик планировщика
    Schedule,

    /// Ручной запуск оператором (HTTP)
    #[default]
    Manual,
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunTrigger::Startup => "startup",
            RunTrigger::Schedule => "schedule",
            RunTrigger::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Стратегия поиска варианта товара по SKU.
///
/// `Scoped` ищет SKU только среди вариантов указанного товара (нужен product id
/// в строке таблицы), `Global` ищет по всему каталогу и берет первое совпадение.
/// За один запуск используется ровно одна стратегия.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    #[default]
    Scoped,
    Global,
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionMode::Scoped => f.write_str("scoped"),
            ResolutionMode::Global => f.write_str("global"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_names() {
        let trigger: RunTrigger = serde_json::from_str(r#""schedule""#).unwrap();
        assert_eq!(trigger, RunTrigger::Schedule);
        assert_eq!(RunTrigger::default().to_string(), "manual");
    }

    #[test]
    fn test_resolution_mode_names() {
        let mode: ResolutionMode = serde_json::from_str(r#""global""#).unwrap();
        assert_eq!(mode, ResolutionMode::Global);
        assert_eq!(ResolutionMode::default().to_string(), "scoped");
    }
}
