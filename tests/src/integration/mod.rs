//! # Integration Tests

pub mod fixtures;

mod bridge;
mod flows;
