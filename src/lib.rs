pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod logging;
pub mod routes;
pub mod services;
pub mod state;
pub mod test_runner;
