//! Cross-module tests and shared test fixtures.

pub mod support;

mod ranking;
