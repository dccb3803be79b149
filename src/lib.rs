//! Augur - incremental daily price cache and technical signal engine for equities

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use types::*;
