//! Scenario definition types
//!
//! Defines the data structures for deserializing YAML scenarios, and the
//! builders used by the built-in suite.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::browser::DialogKind;
use crate::common::{Error, Result};

/// Placeholder expanded to the current local date in expected text
pub const TODAY_PLACEHOLDER: &str = "{{today}}";

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// User actions, executed in order
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Checks made once every step has completed
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
            assertions: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Parse a scenario from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse scenario: {}", e)))
    }

    /// Load a scenario from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}

/// A single user action
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Type text into an input, appending to its value
    TypeText { selector: String, text: String },
    /// Empty a text input
    Clear { selector: String },
    /// Click a visible, enabled element
    Click { selector: String },
    /// Reload the page, keeping local storage
    Reload,
    /// Intercept the next dialog of the given kind
    StubDialog(DialogStub),
    /// Wait until a DOM or storage condition holds
    WaitFor(Assertion),
}

impl Step {
    pub fn type_text(selector: &str, text: &str) -> Self {
        Step::TypeText {
            selector: selector.to_string(),
            text: text.to_string(),
        }
    }

    pub fn clear(selector: &str) -> Self {
        Step::Clear {
            selector: selector.to_string(),
        }
    }

    pub fn click(selector: &str) -> Self {
        Step::Click {
            selector: selector.to_string(),
        }
    }

    pub fn confirm(returns: bool) -> Self {
        Step::StubDialog(DialogStub::Confirm { returns })
    }

    pub fn alert(expect_message: Option<&str>) -> Self {
        Step::StubDialog(DialogStub::Alert {
            expect_message: expect_message.map(str::to_string),
        })
    }

    pub fn wait_for(assertion: Assertion) -> Self {
        Step::WaitFor(assertion)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::TypeText { selector, text } => write!(
                f,
                "type '{}' into {}",
                crate::common::preview(text, 40),
                selector
            ),
            Step::Clear { selector } => write!(f, "clear {}", selector),
            Step::Click { selector } => write!(f, "click {}", selector),
            Step::Reload => f.write_str("reload"),
            Step::StubDialog(stub) => write!(f, "stub {}", stub),
            Step::WaitFor(assertion) => write!(f, "wait for {}", assertion),
        }
    }
}

/// Substitute for a native dialog
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "dialog", rename_all = "snake_case")]
pub enum DialogStub {
    /// Answer a confirmation with a fixed value
    Confirm { returns: bool },
    /// Capture an alert, optionally checking its message contains a substring
    Alert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_message: Option<String>,
    },
}

impl DialogStub {
    pub fn kind(&self) -> DialogKind {
        match self {
            DialogStub::Confirm { .. } => DialogKind::Confirm,
            DialogStub::Alert { .. } => DialogKind::Alert,
        }
    }
}

impl fmt::Display for DialogStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogStub::Confirm { returns } => write!(f, "confirm -> {}", returns),
            DialogStub::Alert {
                expect_message: Some(msg),
            } => write!(f, "alert containing '{}'", msg),
            DialogStub::Alert { expect_message: None } => f.write_str("alert"),
        }
    }
}

/// A check on the observable state of the page
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    /// Number of elements matching the selector
    ElementCount { selector: String, expected: usize },
    /// Text content of matching elements
    ElementText {
        selector: String,
        matcher: TextMatcher,
        #[serde(default)]
        scope: TextScope,
    },
    /// Displayed state of the first matching element
    Visibility { selector: String, visible: bool },
    /// Length of the JSON array stored under a local storage key
    StorageJsonLength { key: String, expected: usize },
}

impl Assertion {
    pub fn count(selector: &str, expected: usize) -> Self {
        Assertion::ElementCount {
            selector: selector.to_string(),
            expected,
        }
    }

    pub fn text(selector: &str, matcher: TextMatcher) -> Self {
        Assertion::ElementText {
            selector: selector.to_string(),
            matcher,
            scope: TextScope::default(),
        }
    }

    pub fn text_in(selector: &str, matcher: TextMatcher, scope: TextScope) -> Self {
        Assertion::ElementText {
            selector: selector.to_string(),
            matcher,
            scope,
        }
    }

    pub fn visible(selector: &str, visible: bool) -> Self {
        Assertion::Visibility {
            selector: selector.to_string(),
            visible,
        }
    }

    pub fn storage_len(key: &str, expected: usize) -> Self {
        Assertion::StorageJsonLength {
            key: key.to_string(),
            expected,
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::ElementCount { selector, expected } => {
                write!(f, "{} has {} element(s)", selector, expected)
            }
            Assertion::ElementText {
                selector,
                matcher,
                scope,
            } => write!(f, "{} ({}) {}", selector, scope, matcher),
            Assertion::Visibility { selector, visible } => write!(
                f,
                "{} is {}",
                selector,
                if *visible { "visible" } else { "hidden" }
            ),
            Assertion::StorageJsonLength { key, expected } => {
                write!(f, "storage '{}' holds {} item(s)", key, expected)
            }
        }
    }
}

/// How element text is compared
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TextMatcher {
    Equals(String),
    Contains(String),
    /// At least this many characters
    MinLength(usize),
}

impl TextMatcher {
    pub fn equals(text: &str) -> Self {
        TextMatcher::Equals(text.to_string())
    }

    pub fn contains(text: &str) -> Self {
        TextMatcher::Contains(text.to_string())
    }

    /// Matcher with placeholders replaced by their current values
    pub fn resolved(&self) -> TextMatcher {
        match self {
            TextMatcher::Equals(s) => TextMatcher::Equals(expand_placeholders(s)),
            TextMatcher::Contains(s) => TextMatcher::Contains(expand_placeholders(s)),
            TextMatcher::MinLength(n) => TextMatcher::MinLength(*n),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextMatcher::Equals(expected) => text.trim() == expected.trim(),
            TextMatcher::Contains(expected) => text.contains(expected.as_str()),
            TextMatcher::MinLength(min) => text.trim().chars().count() >= *min,
        }
    }
}

impl fmt::Display for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatcher::Equals(s) => write!(f, "equals '{}'", crate::common::preview(s, 60)),
            TextMatcher::Contains(s) => write!(f, "contains '{}'", crate::common::preview(s, 60)),
            TextMatcher::MinLength(n) => write!(f, "at least {} chars", n),
        }
    }
}

/// Which matching elements a text assertion applies to
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextScope {
    First,
    #[default]
    Any,
    Every,
}

impl fmt::Display for TextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextScope::First => f.write_str("first"),
            TextScope::Any => f.write_str("any"),
            TextScope::Every => f.write_str("every"),
        }
    }
}

/// Replace `{{today}}` with the current local date as `DD.MM.YYYY`
pub fn expand_placeholders(text: &str) -> String {
    if !text.contains(TODAY_PLACEHOLDER) {
        return text.to_string();
    }
    let today = chrono::Local::now()
        .date_naive()
        .format(crate::browser::sim::app::DISPLAY_DATE_FORMAT)
        .to_string();
    text.replace(TODAY_PLACEHOLDER, &today)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: adds a task
description: add then reload
steps:
  - action: type_text
    selector: 'input[name="task"]'
    text: Купить хлеб
  - action: click
    selector: .btn--add
  - action: stub_dialog
    dialog: confirm
    returns: false
  - action: stub_dialog
    dialog: alert
    expect_message: пустым
  - action: wait_for
    kind: visibility
    selector: section.todo__edit
    visible: true
  - action: reload
assertions:
  - kind: element_count
    selector: '#tasks-container li.task'
    expected: 1
  - kind: element_text
    selector: .task__date
    matcher: { contains: "10.11.2025" }
    scope: first
  - kind: element_text
    selector: .task__name
    matcher: { min_length: 100 }
  - kind: storage_json_length
    key: tasks
    expected: 1
"#;

    #[test]
    fn test_parse_yaml_scenario() {
        let scenario = Scenario::from_yaml(YAML).unwrap();
        assert_eq!(scenario.name, "adds a task");
        assert_eq!(scenario.steps.len(), 6);
        assert_eq!(
            scenario.steps[0],
            Step::type_text(r#"input[name="task"]"#, "Купить хлеб")
        );
        assert_eq!(scenario.steps[2], Step::confirm(false));
        assert_eq!(scenario.steps[3], Step::alert(Some("пустым")));
        assert_eq!(
            scenario.steps[4],
            Step::wait_for(Assertion::visible("section.todo__edit", true))
        );
        assert_eq!(scenario.steps[5], Step::Reload);

        assert_eq!(scenario.assertions.len(), 4);
        assert_eq!(
            scenario.assertions[1],
            Assertion::text_in(
                ".task__date",
                TextMatcher::contains("10.11.2025"),
                TextScope::First
            )
        );
        assert_eq!(
            scenario.assertions[2],
            Assertion::text(".task__name", TextMatcher::MinLength(100))
        );
        assert_eq!(scenario.assertions[3], Assertion::storage_len("tasks", 1));
    }

    #[test]
    fn test_unknown_action_is_config_error() {
        let err = Scenario::from_yaml("name: x\nsteps:\n  - action: hover\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_text_matcher() {
        assert!(TextMatcher::equals("A").matches(" A "));
        assert!(!TextMatcher::equals("A").matches("AB"));
        assert!(TextMatcher::contains("хлеб").matches("Купить хлеб"));
        assert!(TextMatcher::MinLength(3).matches("абв"));
        assert!(!TextMatcher::MinLength(4).matches("абв"));
    }

    #[test]
    fn test_today_placeholder() {
        let expanded = expand_placeholders("on {{today}}");
        assert!(!expanded.contains(TODAY_PLACEHOLDER));
        assert_eq!(expanded.len(), "on ".len() + "DD.MM.YYYY".len());
        assert_eq!(expand_placeholders("plain"), "plain");
    }

    #[test]
    fn test_display() {
        assert_eq!(Step::click(".btn--add").to_string(), "click .btn--add");
        assert_eq!(
            Assertion::count("li.task", 2).to_string(),
            "li.task has 2 element(s)"
        );
        assert_eq!(Step::confirm(true).to_string(), "stub confirm -> true");
    }
}
