pub mod api;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;
