pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod selector;

pub use config::{AppConfig, SelectorConfig};
pub use error::WilayahError;
pub use models::wilayah::{Level, Wilayah};
pub use selector::WilayahSelector;
