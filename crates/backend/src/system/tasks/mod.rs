pub mod initialization;
pub mod logger;
pub mod manager;
pub mod managers;
pub mod worker;
