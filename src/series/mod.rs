pub mod cache;
pub mod daily_series;
pub mod error;
pub mod point_dump;
