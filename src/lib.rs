pub mod analytics;
pub mod api;
pub mod collector;
pub mod config;
pub mod models;
pub mod source;
pub mod storage;
