//! Test fixtures

mod fixtures;

pub use fixtures::{BatchConfig, TestDataFactory, TestScenario};
