//! Scenario results and the run summary

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::common::{Error, Result};

use super::config::Scenario;

/// Result of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub assertions_run: usize,
    pub assertions_total: usize,
    /// Stable code of the failure, e.g. `ELEMENT_NOT_FOUND`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ScenarioResult {
    /// A passing result with nothing run yet
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            passed: true,
            steps_run: 0,
            steps_total: scenario.steps.len(),
            assertions_run: 0,
            assertions_total: scenario.assertions.len(),
            error_code: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn fail(mut self, error: Error) -> Self {
        self.passed = false;
        self.error_code = Some(error.code().to_string());
        self.error = Some(error.to_string());
        self
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    pub fn new(results: Vec<ScenarioResult>, elapsed: Duration) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            passed,
            failed: results.len() - passed,
            duration_ms: elapsed.as_millis() as u64,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Print the closing summary block
    pub fn print(&self) {
        println!("\n{}", "Summary:".cyan().bold());
        for result in &self.results {
            if result.passed {
                println!("  {} {}", "✓".green(), result.name);
            } else {
                println!(
                    "  {} {} [{}]",
                    "✗".red(),
                    result.name,
                    result.error_code.as_deref().unwrap_or("UNKNOWN")
                );
            }
        }

        let counts = format!(
            "{} passed, {} failed ({}ms)",
            self.passed, self.failed, self.duration_ms
        );
        if self.all_passed() {
            println!("\n{}", counts.green().bold());
        } else {
            println!("\n{}", counts.red().bold());
        }
    }

    /// Write the summary as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}
