//! Shared fixtures for unit tests.


pub use image::{build_pe, MetadataBuilder};
