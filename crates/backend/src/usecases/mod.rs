pub mod u508_sync_prices_from_sheet;
