//! WebDriver backend
//!
//! Drives a real browser through a WebDriver server (chromedriver,
//! geckodriver, selenium) with `thirtyfour`. Sessions are created with
//! `unhandledPromptBehavior: ignore` so that native dialogs stay open until
//! the installed [`DialogHandler`] decides how to answer them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thirtyfour::error::{WebDriverError, WebDriverResult};
use thirtyfour::{By, WebDriver, WebElement};

use crate::common::config::WebDriverConfig;
use crate::common::{Error, Result};

use super::{Browser, Dialog, DialogHandler, ElementHandle, ElementState};

/// Dialogs one action may open back to back (confirm, then alert)
const MAX_CHAINED_PROMPTS: usize = 5;

/// Elements found since the last navigation, by handle
#[derive(Default)]
struct ElementCache {
    next_id: u64,
    elements: HashMap<String, WebElement>,
}

/// WebDriver-backed browser session
pub struct WebDriverBrowser {
    driver: WebDriver,
    cache: Mutex<ElementCache>,
    dialogs: Mutex<Option<Arc<dyn DialogHandler>>>,
}

impl WebDriverBrowser {
    /// Open a new session on the configured WebDriver server
    pub async fn connect(config: &WebDriverConfig, request_timeout: Duration) -> Result<Self> {
        let connection_error = |message: String| Error::WebDriverConnection {
            url: config.url.clone(),
            message,
        };
        let driver = tokio::time::timeout(
            request_timeout,
            WebDriver::new(&config.url, capabilities(config)),
        )
        .await
        .map_err(|_| {
            connection_error(format!(
                "no session after {}s",
                request_timeout.as_secs()
            ))
        })?
        .map_err(|e| connection_error(e.to_string()))?;

        tracing::info!("WebDriver session opened on {}", config.url);
        Ok(Self {
            driver,
            cache: Mutex::new(ElementCache::default()),
            dialogs: Mutex::new(None),
        })
    }

    fn cache(&self) -> MutexGuard<'_, ElementCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Handles from before a navigation no longer resolve
    fn forget_elements(&self) {
        self.cache().elements.clear();
    }

    fn remember(&self, found: Vec<WebElement>) -> Vec<ElementHandle> {
        let mut cache = self.cache();
        found
            .into_iter()
            .map(|element| {
                cache.next_id += 1;
                let handle = format!("wd-{}", cache.next_id);
                cache.elements.insert(handle.clone(), element);
                ElementHandle(handle)
            })
            .collect()
    }

    fn element(&self, handle: &ElementHandle) -> Result<WebElement> {
        self.cache()
            .elements
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| Error::StaleElement(handle.to_string()))
    }

    /// Run a command, answering a blocking prompt once if the server reports one
    async fn with_prompts<T, F, Fut>(&self, command: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = WebDriverResult<T>>,
    {
        match command().await {
            Err(WebDriverError::UnexpectedAlertOpen(_)) => {
                self.answer_prompts().await?;
                command().await.map_err(map_error)
            }
            other => other.map_err(map_error),
        }
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let ret = self
            .with_prompts(|| self.driver.execute(script, args.clone()))
            .await?;
        Ok(ret.json().clone())
    }

    /// Route every open prompt to the dialog handler
    async fn answer_prompts(&self) -> Result<()> {
        for _ in 0..MAX_CHAINED_PROMPTS {
            let message = match self.driver.get_alert_text().await {
                Ok(text) => text,
                Err(WebDriverError::NoSuchAlert(_)) => return Ok(()),
                Err(e) => return Err(map_error(e)),
            };

            // Classic WebDriver cannot tell a confirm from an alert
            let dialog = Dialog {
                kind: None,
                message,
            };
            let handler = self
                .dialogs
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            let accept = handler.map_or(true, |h| h.handle(&dialog));
            tracing::debug!("Answering prompt '{}' with accept={}", dialog.message, accept);

            if accept {
                self.driver.accept_alert().await
            } else {
                self.driver.dismiss_alert().await
            }
            .map_err(map_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.forget_elements();
        self.with_prompts(|| self.driver.goto(url))
            .await
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))
    }

    async fn reload(&self) -> Result<()> {
        self.forget_elements();
        self.with_prompts(|| self.driver.refresh())
            .await
            .map_err(|e| Error::Navigation(e.to_string()))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let found = match self.driver.find_all(By::Css(selector)).await {
            Err(e @ WebDriverError::InvalidSelector(_)) => {
                return Err(Error::invalid_selector(selector, &e.to_string()))
            }
            Err(WebDriverError::UnexpectedAlertOpen(_)) => {
                self.answer_prompts().await?;
                self.driver
                    .find_all(By::Css(selector))
                    .await
                    .map_err(map_error)?
            }
            other => other.map_err(map_error)?,
        };
        Ok(self.remember(found))
    }

    async fn element_state(&self, handle: &ElementHandle) -> Result<ElementState> {
        let element = self.element(handle)?;
        // textContent, matching what DOM-based harnesses compare against
        let arg = element.to_json().map_err(map_error)?;
        let text = self
            .execute("return arguments[0].textContent;", vec![arg])
            .await?;
        let displayed = self.with_prompts(|| element.is_displayed()).await?;
        let enabled = self.with_prompts(|| element.is_enabled()).await?;
        let tag = self
            .with_prompts(|| element.tag_name())
            .await?
            .to_ascii_lowercase();

        Ok(ElementState {
            text: text.as_str().unwrap_or_default().to_string(),
            displayed,
            enabled,
            editable: enabled && matches!(tag.as_str(), "input" | "textarea"),
        })
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        let element = self.element(handle)?;
        self.with_prompts(|| element.click()).await?;
        self.answer_prompts().await
    }

    async fn clear(&self, handle: &ElementHandle) -> Result<()> {
        let element = self.element(handle)?;
        self.with_prompts(|| element.clear()).await
    }

    async fn send_keys(&self, handle: &ElementHandle, text: &str) -> Result<()> {
        let element = self.element(handle)?;
        self.with_prompts(|| element.send_keys(text)).await?;
        self.answer_prompts().await
    }

    async fn storage_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .execute(
                "return window.localStorage.getItem(arguments[0]);",
                vec![json!(key)],
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn storage_clear(&self) -> Result<()> {
        self.execute("window.localStorage.clear(); return null;", Vec::new())
            .await?;
        Ok(())
    }

    fn set_dialog_handler(&self, handler: Arc<dyn DialogHandler>) {
        *self
            .dialogs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handler);
    }

    async fn close(&self) -> Result<()> {
        self.forget_elements();
        self.driver.clone().quit().await.map_err(map_error)?;
        tracing::info!("WebDriver session closed");
        Ok(())
    }
}

/// Session capabilities for the configured browser
fn capabilities(config: &WebDriverConfig) -> Map<String, Value> {
    let mut caps = Map::new();
    caps.insert("browserName".into(), json!(config.browser));
    caps.insert("unhandledPromptBehavior".into(), json!("ignore"));
    if config.headless {
        match config.browser.as_str() {
            "chrome" | "chromium" => {
                caps.insert(
                    "goog:chromeOptions".into(),
                    json!({ "args": ["--headless=new"] }),
                );
            }
            "firefox" => {
                caps.insert(
                    "moz:firefoxOptions".into(),
                    json!({ "args": ["-headless"] }),
                );
            }
            "MicrosoftEdge" | "msedge" => {
                caps.insert(
                    "ms:edgeOptions".into(),
                    json!({ "args": ["--headless=new"] }),
                );
            }
            other => tracing::warn!("Headless mode not supported for '{}'", other),
        }
    }
    caps
}

fn map_error(error: WebDriverError) -> Error {
    match error {
        WebDriverError::StaleElementReference(_) | WebDriverError::NoSuchElement(_) => {
            Error::StaleElement(error.to_string())
        }
        WebDriverError::ElementNotInteractable(_)
        | WebDriverError::ElementClickIntercepted(_)
        | WebDriverError::InvalidElementState(_) => {
            Error::not_interactable("element", &error.to_string())
        }
        other => Error::WebDriver(other.to_string()),
    }
}
