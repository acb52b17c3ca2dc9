pub mod charts;
pub mod sheets;

pub use sheets::SheetsClient;
