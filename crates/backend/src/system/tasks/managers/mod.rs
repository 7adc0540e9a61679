pub mod u508_sync_prices;

pub use u508_sync_prices::U508SyncPricesManager;
