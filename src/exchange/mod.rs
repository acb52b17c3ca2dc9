pub mod client;
pub mod models;

pub use client::BinanceClient;
pub use models::{PricePoint, PriceSeries, Ticker24h};
