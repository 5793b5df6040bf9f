pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod importers;
pub mod services;
pub mod utils;
