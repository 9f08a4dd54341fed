pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod ticketing;
pub mod utils;
