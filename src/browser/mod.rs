//! Browser automation capability
//!
//! The runner only talks to the application under test through the
//! [`Browser`] trait. Two backends implement it: an in-process simulation of
//! the to-do application and a W3C WebDriver client for a real browser.

pub mod sim;
pub mod webdriver;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::Result;

pub use sim::SimBrowser;
pub use webdriver::WebDriverBrowser;

/// Opaque reference to an element found by [`Browser::find_all`]
///
/// Handles are only valid until the next re-render or navigation; using one
/// afterwards yields `Error::StaleElement`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observed state of a single element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    /// Text content of the element and its descendants
    pub text: String,
    /// Rendered and not hidden by itself or an ancestor
    pub displayed: bool,
    /// Not disabled
    pub enabled: bool,
    /// An enabled `input` or `textarea`
    pub editable: bool,
}

/// Kind of native dialog raised by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Confirm,
    Alert,
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogKind::Confirm => f.write_str("confirm"),
            DialogKind::Alert => f.write_str("alert"),
        }
    }
}

/// A dialog the page tried to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    /// `None` when the backend cannot tell a confirm from an alert
    pub kind: Option<DialogKind>,
    pub message: String,
}

/// Receives dialogs instead of the real browser prompt
pub trait DialogHandler: Send + Sync {
    /// Return `true` to press OK, `false` to cancel
    fn handle(&self, dialog: &Dialog) -> bool;
}

/// Automation client for the application under test
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load `url` and wait for the page to be ready
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current page, keeping persistent storage
    async fn reload(&self) -> Result<()>;

    /// All elements currently matching a CSS selector, in document order
    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Current state of a previously found element
    async fn element_state(&self, element: &ElementHandle) -> Result<ElementState>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Empty a text input
    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    /// Type text into a text input, appending to its value
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Raw value stored under `key` in the page's local storage
    async fn storage_get(&self, key: &str) -> Result<Option<String>>;

    /// Remove every key from the page's local storage
    async fn storage_clear(&self) -> Result<()>;

    /// Route subsequent dialogs to `handler`
    fn set_dialog_handler(&self, handler: Arc<dyn DialogHandler>);

    /// Release backend resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
