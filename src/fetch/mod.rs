pub mod series;

pub use series::SeriesFetcher;
