pub mod daily;
pub mod error;
pub mod fetch;
pub mod monthly;
pub mod writer;
