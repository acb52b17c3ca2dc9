pub mod config;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod markets;
pub mod portfolio;
pub mod rate;
pub mod report;
pub mod volatility;

pub use error::{AppError, Result};
