pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod generator;
pub mod logging;
pub mod schemas;
