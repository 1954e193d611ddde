//! CLI command handling
//!
//! Resolves configuration, opens the chosen browser backend and runs
//! scenarios through the [`ScenarioRunner`].

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{Browser, SimBrowser, WebDriverBrowser};
use crate::browser::sim::SimOptions;
use crate::commands::{Commands, RunOptions};
use crate::common::config::{BackendKind, Config};
use crate::common::paths::collect_scenario_files;
use crate::common::{Error, Result};
use crate::testing::{todo_app_suite, PollPolicy, RunnerSettings, Scenario, ScenarioRunner};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run { paths, options } => {
            let scenarios = load_scenarios(&paths)?;
            execute(scenarios, &options).await
        }

        Commands::Suite { options } => execute(todo_app_suite(), &options).await,
    }
}

/// Load every scenario file named by `paths`
pub fn load_scenarios(paths: &[PathBuf]) -> Result<Vec<Scenario>> {
    let files = collect_scenario_files(paths)?;
    if files.is_empty() {
        return Err(Error::Config(format!(
            "No scenario files found in {}",
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    files.iter().map(|path| Scenario::from_file(path)).collect()
}

/// Load configuration and apply command-line overrides
pub fn resolve_config(options: &RunOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    if let Some(backend) = options.backend {
        config.target.backend = backend;
    }
    if let Some(url) = &options.base_url {
        config.target.base_url = url.clone();
    }
    if let Some(url) = &options.webdriver_url {
        config.webdriver.url = url.clone();
    }
    if let Some(timeout_ms) = options.timeout_ms {
        config.timeouts.poll_timeout_ms = timeout_ms;
    }
    Ok(config)
}

/// Open the configured browser backend
pub async fn open_browser(config: &Config) -> Result<Box<dyn Browser>> {
    match config.target.backend {
        BackendKind::Sim => {
            tracing::debug!(
                "Using simulated browser (render delay {}ms)",
                config.simulator.render_delay_ms
            );
            Ok(Box::new(SimBrowser::new(SimOptions {
                render_delay: Duration::from_millis(config.simulator.render_delay_ms),
                today: None,
            })))
        }
        BackendKind::Webdriver => {
            let browser = WebDriverBrowser::connect(
                &config.webdriver,
                Duration::from_secs(config.timeouts.request_secs),
            )
            .await?;
            Ok(Box::new(browser))
        }
    }
}

async fn execute(scenarios: Vec<Scenario>, options: &RunOptions) -> Result<()> {
    let config = resolve_config(options)?;
    let browser = open_browser(&config).await?;

    let runner = ScenarioRunner::new(
        browser,
        RunnerSettings {
            base_url: config.target.base_url.clone(),
            poll: PollPolicy::from(&config.timeouts),
            verbose: options.verbose,
        },
    );
    tracing::info!(
        "Running {} scenario(s) against {}",
        scenarios.len(),
        config.target.base_url
    );

    let summary = runner.run_all(&scenarios).await;
    if let Err(e) = runner.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    summary.print();
    if let Some(path) = &options.report {
        summary.write_json(path)?;
    }

    if summary.all_passed() {
        Ok(())
    } else {
        Err(Error::ScenariosFailed {
            failed: summary.failed,
            total: summary.results.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[target]\nbase_url = \"http://app.test/\"\n\n[timeouts]\npoll_timeout_ms = 900\n",
        )
        .unwrap();

        let options = RunOptions {
            config: Some(path.clone()),
            ..Default::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.target.base_url, "http://app.test/");
        assert_eq!(config.timeouts.poll_timeout_ms, 900);

        let options = RunOptions {
            config: Some(path),
            base_url: Some("http://other.test/".into()),
            timeout_ms: Some(100),
            backend: Some(BackendKind::Webdriver),
            ..Default::default()
        };
        let config = resolve_config(&options).unwrap();
        assert_eq!(config.target.base_url, "http://other.test/");
        assert_eq!(config.timeouts.poll_timeout_ms, 100);
        assert_eq!(config.target.backend, BackendKind::Webdriver);
    }

    #[test]
    fn test_load_scenarios_requires_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_scenarios(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
