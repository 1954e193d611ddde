//! Scenario engine
//!
//! Runs declarative scenarios (steps, then assertions) against a
//! [`Browser`](crate::browser::Browser). Every lookup and check is retried
//! with bounded polling, so assertions hold against a page that renders
//! asynchronously.

mod config;
mod dialog;
mod poll;
mod report;
mod runner;
pub mod suite;

pub use config::*;
pub use dialog::{DialogStubs, FiredDialog};
pub use poll::{poll_until, Attempt, PollPolicy};
pub use report::{RunSummary, ScenarioResult};
pub use runner::{RunnerSettings, ScenarioRunner};
pub use suite::todo_app_suite;
