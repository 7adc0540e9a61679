use contracts::usecases::u508_sync_prices_from_sheet::ResolutionMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub sheet: SheetConfig,
    pub shopify: ShopifyConfig,
    pub sync: SyncConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "target/db/app.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Published spreadsheet export (semicolon separated)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SheetConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Keep only rows whose status column equals `status_marker`
    pub status_filter: bool,
    pub status_marker: String,
    pub sku_column: String,
    pub price_column: String,
    pub product_id_column: String,
    pub status_column: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 20,
            status_filter: true,
            status_marker: "u".to_string(),
            sku_column: "product sku".to_string(),
            price_column: "recommended price".to_string(),
            product_id_column: "internal product id".to_string(),
            status_column: "status".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// shop + access_token from this file / environment
    #[default]
    Config,
    /// offline session row in the local database
    Database,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ShopifyConfig {
    pub shop: String,
    pub access_token: String,
    pub api_version: String,
    /// Overrides `https://{shop}`; used for proxies and tests
    pub api_base_url: Option<String>,
    pub timeout_secs: u64,
    pub session_source: SessionSource,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            shop: String::new(),
            access_token: String::new(),
            api_version: "2024-10".to_string(),
            api_base_url: None,
            timeout_secs: 30,
            session_source: SessionSource::Config,
        }
    }
}

/// Верхняя граница `sync.run_budget_secs` (сутки)
pub const MAX_RUN_BUDGET_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub resolution_mode: ResolutionMode,
    pub batch_size: usize,
    pub cooldown_ms: u64,
    pub scoped_variant_cap: u32,
    pub run_budget_secs: u64,
    pub run_on_startup: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resolution_mode: ResolutionMode::Scoped,
            batch_size: 10,
            cooldown_ms: 300,
            scoped_variant_cap: 100,
            run_budget_secs: 120,
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Cron expression with seconds field (`cron` crate syntax)
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: "0 * * * * *".to_string(),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[sheet]
url = ""
timeout_secs = 20
status_filter = true
status_marker = "u"

[shopify]
api_version = "2024-10"
session_source = "config"

[sync]
resolution_mode = "scoped"
batch_size = 10
cooldown_ms = 300
scoped_variant_cap = 100

[schedule]
enabled = true
cron = "0 * * * * *"
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
///
/// `SHOPIFY_SHOP`, `SHOPIFY_ACCESS_TOKEN` and `SHEET_URL` override the file.
pub fn load_config() -> anyhow::Result<Config> {
    let mut config = match find_config_file() {
        Some(config_path) => {
            tracing::info!("Loading config from: {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            parse_config(&contents)?
        }
        None => {
            tracing::info!("Using default embedded configuration");
            parse_config(DEFAULT_CONFIG)?
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let config_path = exe_path.parent()?.join("config.toml");
    if config_path.exists() {
        Some(config_path)
    } else {
        tracing::warn!("config.toml not found at: {}", config_path.display());
        None
    }
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(contents)?)
}

fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(shop) = get("SHOPIFY_SHOP").filter(|v| !v.trim().is_empty()) {
        config.shopify.shop = shop;
    }
    if let Some(token) = get("SHOPIFY_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()) {
        config.shopify.access_token = token;
    }
    if let Some(url) = get("SHEET_URL").filter(|v| !v.trim().is_empty()) {
        config.sheet.url = url;
    }
}

pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.sync.batch_size == 0 {
        anyhow::bail!("sync.batch_size must be greater than 0");
    }
    if !(1..=250).contains(&config.sync.scoped_variant_cap) {
        anyhow::bail!(
            "sync.scoped_variant_cap must be within 1..=250, got {}",
            config.sync.scoped_variant_cap
        );
    }
    if !(1..=MAX_RUN_BUDGET_SECS).contains(&config.sync.run_budget_secs) {
        anyhow::bail!(
            "sync.run_budget_secs must be within 1..={}, got {}",
            MAX_RUN_BUDGET_SECS,
            config.sync.run_budget_secs
        );
    }
    if config.schedule.enabled {
        cron::Schedule::from_str(&config.schedule.cron).map_err(|e| {
            anyhow::anyhow!("invalid schedule.cron '{}': {}", config.schedule.cron, e)
        })?;
    }
    Ok(())
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}
