pub mod common;
pub mod generate;
pub mod select;
pub mod types;
