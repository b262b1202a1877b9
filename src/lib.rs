pub mod audit;
pub mod certification;
pub mod config;
pub mod db;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod format;
pub mod matcher;
pub mod models;
pub mod routes;
pub mod s3;
pub mod schema;
pub mod sources;
pub mod stamp;
pub mod state;
pub mod storage;
pub mod store;
pub mod utils;
