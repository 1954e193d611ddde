//! todo-e2e - Declarative end-to-end scenarios for a to-do web app
//!
//! This library provides the scenario engine, the browser capability it
//! drives, and the built-in suite for the to-do app.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{Assertion, Scenario, ScenarioRunner, Step};
