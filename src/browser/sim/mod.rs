//! In-process browser serving a model of the to-do application
//!
//! The simulation keeps the behaviour a scenario can observe in a real
//! browser: per-origin local storage that survives reloads, a DOM that is
//! re-rendered some time after each state change, handles that go stale on
//! re-render, and native dialogs routed through a [`DialogHandler`].

pub mod app;
pub mod dom;
pub mod selector;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::common::{Error, Result};

use self::app::{Field, LocalStorage, SaveOutcome, TodoApp, DELETE_ALL_CONFIRM};
use self::dom::{Document, NodeId};
use self::selector::Selector;
use super::{Browser, Dialog, DialogHandler, DialogKind, ElementHandle, ElementState};

/// Simulation settings
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Delay between a state change and the DOM showing it
    pub render_delay: Duration,
    /// Fixed "current date" for tasks added without a date
    pub today: Option<NaiveDate>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            render_delay: Duration::from_millis(25),
            today: None,
        }
    }
}

struct PendingRender {
    due: Instant,
    dom: Document,
}

struct Page {
    url: String,
    origin: String,
    app: TodoApp,
    dom: Document,
    generation: u64,
    pending: Option<PendingRender>,
}

#[derive(Default)]
struct SimState {
    storage: HashMap<String, LocalStorage>,
    page: Option<Page>,
    next_generation: u64,
}

impl SimState {
    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Current page with any due render applied
    fn page(&mut self) -> Result<&mut Page> {
        let now = Instant::now();
        let due = matches!(&self.page, Some(Page { pending: Some(p), .. }) if p.due <= now);
        if due {
            let generation = self.bump_generation();
            if let Some(page) = self.page.as_mut() {
                if let Some(pending) = page.pending.take() {
                    page.dom = pending.dom;
                    page.generation = generation;
                }
            }
        }
        self.page
            .as_mut()
            .ok_or_else(|| Error::Navigation("no page loaded".to_string()))
    }
}

/// What a click asks the page to do
enum ClickAction {
    Add,
    Edit(u64),
    Save,
    DeleteAll,
    Nothing,
}

/// Simulated browser running the to-do application
pub struct SimBrowser {
    state: Mutex<SimState>,
    dialogs: Mutex<Option<Arc<dyn DialogHandler>>>,
    options: SimOptions,
}

impl Default for SimBrowser {
    fn default() -> Self {
        Self::new(SimOptions::default())
    }
}

impl SimBrowser {
    pub fn new(options: SimOptions) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            dialogs: Mutex::new(None),
            options,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("simulated browser state poisoned".to_string()))
    }

    fn today(&self) -> NaiveDate {
        self.options
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn load(&self, url: &str) -> Result<()> {
        let origin = origin_of(url)?;
        let mut state = self.lock()?;
        let generation = state.bump_generation();
        let storage = state.storage.entry(origin.clone()).or_default();
        let app = TodoApp::load(storage);
        let dom = app.render();
        state.page = Some(Page {
            url: url.to_string(),
            origin,
            app,
            dom,
            generation,
            pending: None,
        });
        tracing::debug!("Loaded {} (generation {})", url, generation);
        Ok(())
    }

    /// Persist the model and schedule the DOM update
    fn commit(&self, state: &mut SimState) -> Result<()> {
        let delay = self.options.render_delay;
        let generation = if delay.is_zero() {
            Some(state.bump_generation())
        } else {
            None
        };
        let page = state
            .page
            .as_mut()
            .ok_or_else(|| Error::Navigation("no page loaded".to_string()))?;
        let storage = state.storage.entry(page.origin.clone()).or_default();
        page.app.persist(storage)?;

        let dom = page.app.render();
        match generation {
            Some(generation) => {
                page.dom = dom;
                page.generation = generation;
                page.pending = None;
            }
            None => {
                page.pending = Some(PendingRender {
                    due: Instant::now() + delay,
                    dom,
                });
            }
        }
        Ok(())
    }

    fn dialog(&self, kind: DialogKind, message: &str) -> bool {
        let handler = self.dialogs.lock().ok().and_then(|h| h.clone());
        let dialog = Dialog {
            kind: Some(kind),
            message: message.to_string(),
        };
        match handler {
            Some(handler) => handler.handle(&dialog),
            None => {
                tracing::debug!("No dialog handler, accepting {}: {}", kind, message);
                true
            }
        }
    }

    fn do_click(&self, element: &ElementHandle) -> Result<()> {
        let action = {
            let mut state = self.lock()?;
            let page = state.page()?;
            let node = resolve(page, element)?;
            let el = page
                .dom
                .element(node)
                .ok_or_else(|| Error::StaleElement(element.to_string()))?;
            if !page.dom.is_displayed(node) {
                return Err(Error::not_interactable(&element.0, "element is not visible"));
            }
            if el.disabled {
                return Err(Error::not_interactable(&element.0, "element is disabled"));
            }

            if el.has_class("btn--add") {
                ClickAction::Add
            } else if el.has_class("btn--edit") {
                match el.get_attr("data-id").and_then(|id| id.parse().ok()) {
                    Some(id) => ClickAction::Edit(id),
                    None => ClickAction::Nothing,
                }
            } else if el.has_class("btn--save") {
                ClickAction::Save
            } else if el.has_class("btn--delete-all") {
                ClickAction::DeleteAll
            } else {
                ClickAction::Nothing
            }
        };

        let alert = match action {
            ClickAction::Nothing => None,
            ClickAction::Add => {
                let today = self.today();
                let mut state = self.lock()?;
                if state.page()?.app.add(today) {
                    self.commit(&mut state)?;
                }
                None
            }
            ClickAction::Edit(id) => {
                let mut state = self.lock()?;
                if state.page()?.app.start_edit(id) {
                    self.commit(&mut state)?;
                }
                None
            }
            ClickAction::Save => {
                let mut state = self.lock()?;
                match state.page()?.app.save_edit() {
                    SaveOutcome::Saved => {
                        self.commit(&mut state)?;
                        None
                    }
                    SaveOutcome::Rejected(message) => Some(message),
                    SaveOutcome::Ignored => None,
                }
            }
            ClickAction::DeleteAll => {
                if self.dialog(DialogKind::Confirm, DELETE_ALL_CONFIRM) {
                    let mut state = self.lock()?;
                    state.page()?.app.delete_all();
                    self.commit(&mut state)?;
                }
                None
            }
        };

        if let Some(message) = alert {
            self.dialog(DialogKind::Alert, &message);
        }
        Ok(())
    }

    fn edit_field(&self, element: &ElementHandle, edit: impl FnOnce(&mut String)) -> Result<()> {
        let mut state = self.lock()?;
        let page = state.page()?;
        let node = resolve(page, element)?;
        let el = page
            .dom
            .element(node)
            .ok_or_else(|| Error::StaleElement(element.to_string()))?;
        if !el.is_editable() {
            return Err(Error::not_interactable(&element.0, "element does not accept text"));
        }
        if !page.dom.is_displayed(node) {
            return Err(Error::not_interactable(&element.0, "element is not visible"));
        }
        let field = el
            .get_attr("data-field")
            .and_then(|f| Field::from_attr(&f))
            .ok_or_else(|| Error::not_interactable(&element.0, "input is not bound"))?;
        edit(page.app.field_mut(field));
        Ok(())
    }
}

#[async_trait]
impl Browser for SimBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.load(url)
    }

    async fn reload(&self) -> Result<()> {
        let url = {
            let state = self.lock()?;
            state
                .page
                .as_ref()
                .map(|p| p.url.clone())
                .ok_or_else(|| Error::Navigation("nothing to reload".to_string()))?
        };
        self.load(&url)
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let selector = Selector::parse(selector)?;
        let mut state = self.lock()?;
        let page = state.page()?;
        Ok(page
            .dom
            .select(&selector)
            .into_iter()
            .map(|node| encode(page.generation, node))
            .collect())
    }

    async fn element_state(&self, element: &ElementHandle) -> Result<ElementState> {
        let mut state = self.lock()?;
        let page = state.page()?;
        let node = resolve(page, element)?;
        let el = page
            .dom
            .element(node)
            .ok_or_else(|| Error::StaleElement(element.to_string()))?;
        Ok(ElementState {
            text: page.dom.text_content(node),
            displayed: page.dom.is_displayed(node),
            enabled: !el.disabled,
            editable: el.is_editable(),
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.do_click(element)
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.edit_field(element, String::clear)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.edit_field(element, |value| value.push_str(text))
    }

    async fn storage_get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.lock()?;
        let origin = state.page()?.origin.clone();
        Ok(state.storage.get(&origin).and_then(|s| s.get(key).cloned()))
    }

    async fn storage_clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        let origin = state.page()?.origin.clone();
        state.storage.remove(&origin);
        Ok(())
    }

    fn set_dialog_handler(&self, handler: Arc<dyn DialogHandler>) {
        if let Ok(mut slot) = self.dialogs.lock() {
            *slot = Some(handler);
        }
    }
}

fn origin_of(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Navigation(format!("invalid url '{}': {}", url, e)))?;
    Ok(parsed.origin().ascii_serialization())
}

fn encode(generation: u64, node: NodeId) -> ElementHandle {
    ElementHandle(format!("{}:{}", generation, node))
}

fn resolve(page: &Page, element: &ElementHandle) -> Result<NodeId> {
    let (generation, node) = element
        .0
        .split_once(':')
        .and_then(|(g, n)| Some((g.parse::<u64>().ok()?, n.parse::<NodeId>().ok()?)))
        .ok_or_else(|| Error::Internal(format!("malformed element handle '{}'", element)))?;
    if generation != page.generation {
        return Err(Error::StaleElement(element.to_string()));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:5500/";

    fn instant() -> SimBrowser {
        SimBrowser::new(SimOptions {
            render_delay: Duration::ZERO,
            today: NaiveDate::from_ymd_opt(2026, 10, 17),
        })
    }

    struct Answer(bool);

    impl DialogHandler for Answer {
        fn handle(&self, _dialog: &Dialog) -> bool {
            self.0
        }
    }

    async fn first(browser: &SimBrowser, selector: &str) -> ElementHandle {
        browser.find_all(selector).await.unwrap().remove(0)
    }

    async fn add(browser: &SimBrowser, name: &str) {
        let input = first(browser, r#"input[name="task"]"#).await;
        browser.send_keys(&input, name).await.unwrap();
        let button = first(browser, ".btn--add").await;
        browser.click(&button).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_and_reload_keeps_tasks() {
        let browser = instant();
        browser.navigate(BASE).await.unwrap();
        add(&browser, "Купить хлеб").await;

        let names = browser.find_all(".task__name").await.unwrap();
        assert_eq!(names.len(), 1);
        let date = first(&browser, ".task__date").await;
        assert_eq!(browser.element_state(&date).await.unwrap().text, "17.10.2026");

        browser.reload().await.unwrap();
        assert_eq!(browser.find_all("li.task").await.unwrap().len(), 1);
        let raw = browser.storage_get("tasks").await.unwrap().unwrap();
        assert!(raw.contains("Купить хлеб"));
    }

    #[tokio::test]
    async fn test_handles_go_stale_after_render() {
        let browser = instant();
        browser.navigate(BASE).await.unwrap();
        let count = first(&browser, "#task-count").await;
        add(&browser, "A").await;
        let err = browser.element_state(&count).await.unwrap_err();
        assert!(matches!(err, Error::StaleElement(_)));
    }

    #[tokio::test]
    async fn test_render_delay_defers_dom_update() {
        let browser = SimBrowser::new(SimOptions {
            render_delay: Duration::from_millis(40),
            today: None,
        });
        browser.navigate(BASE).await.unwrap();
        add(&browser, "A").await;
        assert!(browser.find_all("li.task").await.unwrap().is_empty());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(browser.find_all("li.task").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_respects_confirm_answer() {
        let browser = instant();
        browser.navigate(BASE).await.unwrap();
        add(&browser, "A").await;

        browser.set_dialog_handler(Arc::new(Answer(false)));
        let delete = first(&browser, ".btn--delete-all").await;
        browser.click(&delete).await.unwrap();
        assert_eq!(browser.find_all("li.task").await.unwrap().len(), 1);

        browser.set_dialog_handler(Arc::new(Answer(true)));
        let delete = first(&browser, ".btn--delete-all").await;
        browser.click(&delete).await.unwrap();
        assert!(browser.find_all("li.task").await.unwrap().is_empty());
        assert_eq!(browser.storage_get("tasks").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_hidden_elements_are_not_interactable() {
        let browser = instant();
        browser.navigate(BASE).await.unwrap();
        let save = first(&browser, ".btn--save").await;
        let err = browser.click(&save).await.unwrap_err();
        assert!(matches!(err, Error::ElementNotInteractable { .. }));

        let count = first(&browser, "#task-count").await;
        let err = browser.send_keys(&count, "x").await.unwrap_err();
        assert!(matches!(err, Error::ElementNotInteractable { .. }));
    }

    #[tokio::test]
    async fn test_storage_is_per_origin_and_clearable() {
        let browser = instant();
        browser.navigate(BASE).await.unwrap();
        add(&browser, "A").await;

        browser.navigate("http://127.0.0.1:8080/").await.unwrap();
        assert_eq!(browser.storage_get("tasks").await.unwrap(), None);

        browser.navigate(BASE).await.unwrap();
        browser.storage_clear().await.unwrap();
        browser.reload().await.unwrap();
        assert!(browser.find_all("li.task").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_requires_navigation() {
        let browser = instant();
        assert!(matches!(
            browser.find_all("li").await.unwrap_err(),
            Error::Navigation(_)
        ));
        assert!(matches!(
            browser.navigate("not a url").await.unwrap_err(),
            Error::Navigation(_)
        ));
    }
}
