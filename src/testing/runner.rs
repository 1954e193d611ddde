//! Scenario runner implementation
//!
//! Executes scenarios against a [`Browser`]. Each scenario starts from a
//! cleared page, runs its steps in order, then its assertions, and stops at
//! the first failure. Failures never leak into the next scenario.

use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use serde_json::Value;

use crate::browser::{Browser, ElementHandle};
use crate::common::{preview, Error, Result};

use super::config::{Assertion, Scenario, Step, TextScope};
use super::dialog::DialogStubs;
use super::poll::{poll_until, Attempt, PollPolicy};
use super::report::{RunSummary, ScenarioResult};

/// Runner settings
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Location loaded by `set_up` before every scenario
    pub base_url: String,
    /// Retry policy for every locate and check
    pub poll: PollPolicy,
    /// Print setup details and per-check timings
    pub verbose: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5500/".to_string(),
            poll: PollPolicy::default(),
            verbose: false,
        }
    }
}

/// What a located element must allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Need {
    /// Exists and accepts text input
    Text,
    /// Visible and enabled
    Click,
}

/// Runs scenarios one at a time against a single browser
pub struct ScenarioRunner {
    browser: Box<dyn Browser>,
    stubs: Arc<DialogStubs>,
    settings: RunnerSettings,
}

impl ScenarioRunner {
    /// Wrap a browser and install the runner's dialog stubs on it
    pub fn new(browser: Box<dyn Browser>, settings: RunnerSettings) -> Self {
        let stubs = Arc::new(DialogStubs::new());
        browser.set_dialog_handler(stubs.clone());
        Self {
            browser,
            stubs,
            settings,
        }
    }

    pub fn dialogs(&self) -> &DialogStubs {
        &self.stubs
    }

    /// Load the base location with empty local storage
    ///
    /// Storage can only be cleared once the origin is loaded, so the page is
    /// reloaded afterwards to start from the cleared state.
    pub async fn set_up(&self) -> Result<()> {
        self.stubs.reset();
        self.browser.navigate(&self.settings.base_url).await?;
        self.browser.storage_clear().await?;
        self.browser.reload().await?;
        tracing::debug!("Fresh page at {}", self.settings.base_url);
        Ok(())
    }

    /// Execute a single step
    pub async fn run_step(&self, step: &Step) -> Result<()> {
        match step {
            Step::TypeText { selector, text } => {
                self.interact(selector, Need::Text, move |browser, element| async move {
                    browser.send_keys(&element, text).await
                })
                .await
            }
            Step::Clear { selector } => {
                self.interact(selector, Need::Text, move |browser, element| async move {
                    browser.clear(&element).await
                })
                .await
            }
            Step::Click { selector } => {
                self.interact(selector, Need::Click, move |browser, element| async move {
                    browser.click(&element).await
                })
                .await
            }
            Step::Reload => self.browser.reload().await,
            Step::StubDialog(stub) => {
                self.stubs.install(stub.clone());
                Ok(())
            }
            Step::WaitFor(assertion) => self.run_assertion(assertion).await,
        }
    }

    /// Evaluate an assertion, retrying until it holds or the poll times out
    pub async fn run_assertion(&self, assertion: &Assertion) -> Result<()> {
        let browser = self.browser.as_ref();
        let timeout_ms = self.settings.poll.timeout_ms();
        poll_until(&self.settings.poll, move || async move {
            Attempt::from_result(check(browser, assertion, timeout_ms).await)
        })
        .await
    }

    /// Locate an element and act on it, retrying both as one unit
    async fn interact<'a, F, Fut>(&'a self, selector: &'a str, need: Need, act: F) -> Result<()>
    where
        F: Fn(&'a dyn Browser, ElementHandle) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let browser = self.browser.as_ref();
        let timeout_ms = self.settings.poll.timeout_ms();
        let act = &act;
        poll_until(&self.settings.poll, move || async move {
            let outcome = match locate(browser, selector, need, timeout_ms).await {
                // Backends name the handle; report the selector instead
                Ok(element) => act(browser, element).await.map_err(|e| match e {
                    Error::ElementNotInteractable { reason, .. } => {
                        Error::not_interactable(selector, &reason)
                    }
                    other => other,
                }),
                Err(e) => Err(e),
            };
            Attempt::from_result(outcome)
        })
        .await
    }

    /// Run a scenario from a fresh page and report its outcome
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let started = Instant::now();
        let mut result = ScenarioResult::new(scenario);

        println!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        tracing::info!("Scenario '{}' started", scenario.name);

        if let Err(e) = self.set_up().await {
            println!("  {} Setup: {}", "✗".red(), e);
            return self.finish(result.fail(e), started);
        }
        if self.settings.verbose {
            println!("  Base URL: {}", self.settings.base_url.dimmed());
        }

        if !scenario.steps.is_empty() {
            println!("\n{}", "Steps:".cyan());
        }
        for (i, step) in scenario.steps.iter().enumerate() {
            let step_num = i + 1;
            let step_started = Instant::now();
            result.steps_run = step_num;
            match self.run_step(step).await {
                Ok(()) => {
                    println!(
                        "  {} Step {}: {}{}",
                        "✓".green(),
                        step_num,
                        step.to_string().dimmed(),
                        self.timing(step_started)
                    );
                }
                Err(e) => {
                    println!("  {} Step {}: {} ({})", "✗".red(), step_num, step, e);
                    return self.finish(result.fail(e), started);
                }
            }
        }

        if !scenario.assertions.is_empty() {
            println!("\n{}", "Assertions:".cyan());
        }
        for (i, assertion) in scenario.assertions.iter().enumerate() {
            let assert_num = i + 1;
            let assert_started = Instant::now();
            result.assertions_run = assert_num;
            match self.run_assertion(assertion).await {
                Ok(()) => {
                    println!(
                        "  {} Assert {}: {}{}",
                        "✓".green(),
                        assert_num,
                        assertion.to_string().dimmed(),
                        self.timing(assert_started)
                    );
                }
                Err(e) => {
                    println!("  {} Assert {}: {} ({})", "✗".red(), assert_num, assertion, e);
                    return self.finish(result.fail(e), started);
                }
            }
        }

        if let Err(e) = self.stubs.verify() {
            println!("  {} Dialogs: {}", "✗".red(), e);
            return self.finish(result.fail(e), started);
        }

        println!(
            "\n{} {}",
            "✓".green().bold(),
            "Scenario Passed".green().bold()
        );
        self.finish(result, started)
    }

    /// Run scenarios one after another
    pub async fn run_all(&self, scenarios: &[Scenario]) -> RunSummary {
        let started = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            results.push(self.run_scenario(scenario).await);
        }
        RunSummary::new(results, started.elapsed())
    }

    /// Release the browser
    pub async fn close(self) -> Result<()> {
        self.browser.close().await
    }

    fn finish(&self, mut result: ScenarioResult, started: Instant) -> ScenarioResult {
        result.duration_ms = started.elapsed().as_millis() as u64;
        match &result.error {
            Some(error) => tracing::warn!("Scenario '{}' failed: {}", result.name, error),
            None => tracing::info!(
                "Scenario '{}' passed in {}ms",
                result.name,
                result.duration_ms
            ),
        }
        result
    }

    fn timing(&self, started: Instant) -> String {
        if self.settings.verbose {
            format!(" {}", format!("({}ms)", started.elapsed().as_millis()).dimmed())
        } else {
            String::new()
        }
    }
}

/// Find the first element matching `selector` that satisfies `need`
///
/// Errors are transient so the caller's poll keeps trying until timeout.
async fn locate(
    browser: &dyn Browser,
    selector: &str,
    need: Need,
    timeout_ms: u64,
) -> Result<ElementHandle> {
    let element = browser
        .find_all(selector)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(selector, timeout_ms))?;
    let state = browser.element_state(&element).await?;
    match need {
        Need::Text if !state.editable => Err(Error::not_interactable(
            selector,
            "element does not accept text input",
        )),
        Need::Click if !state.displayed => {
            Err(Error::not_interactable(selector, "element is not visible"))
        }
        Need::Click if !state.enabled => {
            Err(Error::not_interactable(selector, "element is disabled"))
        }
        _ => Ok(element),
    }
}

/// One evaluation of an assertion; mismatches are transient errors
async fn check(browser: &dyn Browser, assertion: &Assertion, timeout_ms: u64) -> Result<()> {
    match assertion {
        Assertion::ElementCount { selector, expected } => {
            let actual = browser.find_all(selector).await?.len();
            if actual != *expected {
                return Err(Error::assertion_failed(
                    selector,
                    format!("{} element(s)", expected),
                    format!("{} element(s)", actual),
                ));
            }
            Ok(())
        }

        Assertion::ElementText {
            selector,
            matcher,
            scope,
        } => {
            let elements = browser.find_all(selector).await?;
            if elements.is_empty() {
                return Err(Error::not_found(selector, timeout_ms));
            }
            let elements = match scope {
                TextScope::First => &elements[..1],
                TextScope::Any | TextScope::Every => &elements[..],
            };
            let mut texts = Vec::with_capacity(elements.len());
            for element in elements {
                texts.push(browser.element_state(element).await?.text);
            }

            let matcher = matcher.resolved();
            let ok = match scope {
                TextScope::First | TextScope::Any => texts.iter().any(|t| matcher.matches(t)),
                TextScope::Every => texts.iter().all(|t| matcher.matches(t)),
            };
            if !ok {
                let actual: Vec<String> = texts.iter().map(|t| preview(t, 60)).collect();
                return Err(Error::assertion_failed(
                    selector,
                    format!("{} text {}", scope, matcher),
                    format!("{:?}", actual),
                ));
            }
            Ok(())
        }

        Assertion::Visibility { selector, visible } => {
            let element = browser
                .find_all(selector)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(selector, timeout_ms))?;
            let displayed = browser.element_state(&element).await?.displayed;
            if displayed != *visible {
                return Err(Error::assertion_failed(
                    selector,
                    visibility(*visible),
                    visibility(displayed),
                ));
            }
            Ok(())
        }

        Assertion::StorageJsonLength { key, expected } => {
            let raw = browser.storage_get(key).await?;
            let actual = json_array_len(raw.as_deref()).map_err(|actual| {
                Error::assertion_failed(key, format!("a JSON array of {}", expected), actual)
            })?;
            if actual != *expected {
                return Err(Error::assertion_failed(
                    key,
                    format!("{} item(s)", expected),
                    format!("{} item(s)", actual),
                ));
            }
            Ok(())
        }
    }
}

fn visibility(visible: bool) -> &'static str {
    if visible {
        "visible"
    } else {
        "hidden"
    }
}

/// Length of a stored JSON array; a missing key counts as empty
fn json_array_len(raw: Option<&str>) -> std::result::Result<usize, String> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => Ok(items.len()),
        Ok(_) | Err(_) => Err(format!("'{}'", preview(raw, 60))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_array_len() {
        assert_eq!(json_array_len(None), Ok(0));
        assert_eq!(json_array_len(Some("[]")), Ok(0));
        assert_eq!(json_array_len(Some(r#"[{"id":1},{"id":2}]"#)), Ok(2));
        assert!(json_array_len(Some(r#"{"id":1}"#)).is_err());
        assert!(json_array_len(Some("not json")).is_err());
    }

    #[test]
    fn test_default_settings() {
        let settings = RunnerSettings::default();
        assert_eq!(settings.base_url, "http://localhost:5500/");
        assert_eq!(settings.poll.timeout_ms(), 4000);
    }
}
