//! Model of the to-do list application served by the simulated browser
//!
//! State lives in [`TodoApp`]; [`TodoApp::render`] produces the DOM the page
//! shows for that state. Tasks persist in local storage under
//! [`STORAGE_KEY`] as a JSON array.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::Result;

use super::dom::{Document, El};

/// Local storage key holding the task list
pub const STORAGE_KEY: &str = "tasks";

/// Alert raised when saving an edit with an empty name
pub const EMPTY_NAME_ALERT: &str = "Название задачи не может быть пустым!";

/// Confirmation asked before deleting every task
pub const DELETE_ALL_CONFIRM: &str = "Удалить все задачи?";

/// Text of the empty-state banner
pub const EMPTY_BANNER: &str = "u don't have any tasks yet :(";

/// Format of the date input
const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of the displayed date (ru-RU locale)
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

/// One origin's local storage
pub type LocalStorage = HashMap<String, String>;

/// Task record as persisted in local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub name: String,
    pub date: NaiveDate,
}

/// Text inputs bound to application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Task,
    Date,
    Edit,
}

impl Field {
    /// Field bound to an input through its `data-field` attribute
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "task" => Some(Field::Task),
            "date" => Some(Field::Date),
            "edit" => Some(Field::Edit),
            _ => None,
        }
    }
}

/// Result of pressing the save button in the edit panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Validation failed; the page shows this alert
    Rejected(String),
    /// Save pressed with no task being edited
    Ignored,
}

#[derive(Debug, Default)]
pub struct TodoApp {
    tasks: Vec<Task>,
    task_input: String,
    date_input: String,
    edit_input: String,
    editing: Option<u64>,
}

impl TodoApp {
    /// Start the page from persisted state
    ///
    /// A missing or unreadable entry starts with an empty list.
    pub fn load(storage: &LocalStorage) -> Self {
        let tasks = match storage.get(STORAGE_KEY) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable '{}' entry: {}", STORAGE_KEY, e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn persist(&self, storage: &mut LocalStorage) -> Result<()> {
        storage.insert(STORAGE_KEY.to_string(), serde_json::to_string(&self.tasks)?);
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Task => &mut self.task_input,
            Field::Date => &mut self.date_input,
            Field::Edit => &mut self.edit_input,
        }
    }

    /// Add a task from the form inputs
    ///
    /// Returns false when the trimmed name is empty. A missing or unparsable
    /// date falls back to `today`.
    pub fn add(&mut self, today: NaiveDate) -> bool {
        let name = self.task_input.trim();
        if name.is_empty() {
            return false;
        }
        let date = NaiveDate::parse_from_str(self.date_input.trim(), INPUT_DATE_FORMAT)
            .unwrap_or(today);
        let id = self.tasks.iter().map(|t| t.id).max().map_or(1, |max| max + 1);
        self.tasks.push(Task {
            id,
            name: name.to_string(),
            date,
        });
        self.task_input.clear();
        self.date_input.clear();
        true
    }

    /// Open the edit panel for a task, pre-filled with its name
    pub fn start_edit(&mut self, id: u64) -> bool {
        match self.tasks.iter().find(|t| t.id == id) {
            Some(task) => {
                self.edit_input = task.name.clone();
                self.editing = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn save_edit(&mut self) -> SaveOutcome {
        let Some(id) = self.editing else {
            return SaveOutcome::Ignored;
        };
        let name = self.edit_input.trim();
        if name.is_empty() {
            return SaveOutcome::Rejected(EMPTY_NAME_ALERT.to_string());
        }
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.name = name.to_string();
        }
        self.editing = None;
        self.edit_input.clear();
        SaveOutcome::Saved
    }

    pub fn delete_all(&mut self) {
        self.tasks.clear();
        self.editing = None;
    }

    /// Build the page for the current state
    pub fn render(&self) -> Document {
        let mut doc = Document::new();
        let body = doc.append(doc.root(), El::new("body"));
        let main = doc.append(body, El::new("main").class("todo"));

        let form = doc.append(main, El::new("form").id("add-form").class("todo__form"));
        doc.append(
            form,
            El::new("input")
                .attr("type", "text")
                .attr("name", "task")
                .attr("placeholder", "New task")
                .attr("data-field", "task"),
        );
        doc.append(
            form,
            El::new("input")
                .attr("type", "date")
                .attr("name", "date")
                .attr("data-field", "date"),
        );
        doc.append(
            form,
            El::new("button")
                .class("btn btn--add")
                .attr("type", "submit")
                .text("Add"),
        );

        let list = doc.append(main, El::new("section").class("todo__list"));
        let header = doc.append(list, El::new("div").class("todo__header"));
        let counter = doc.append(header, El::new("span").text("Tasks: "));
        doc.append(
            counter,
            El::new("span")
                .id("task-count")
                .text(self.tasks.len().to_string()),
        );
        doc.append(
            header,
            El::new("button")
                .class("btn btn--delete-all")
                .attr("type", "button")
                .text("Delete all"),
        );

        let container = doc.append(list, El::new("ul").id("tasks-container"));
        for task in &self.tasks {
            let id = task.id.to_string();
            let item = doc.append(container, El::new("li").class("task").attr("data-id", &id));
            doc.append(item, El::new("span").class("task__name").text(task.name.as_str()));
            doc.append(
                item,
                El::new("span")
                    .class("task__date")
                    .text(task.date.format(DISPLAY_DATE_FORMAT).to_string()),
            );
            doc.append(
                item,
                El::new("button")
                    .class("btn btn--edit")
                    .attr("type", "button")
                    .attr("data-id", &id)
                    .text("Edit"),
            );
        }

        let empty = doc.append(
            main,
            El::new("section")
                .class("todo__empty")
                .hidden(!self.tasks.is_empty()),
        );
        doc.append(empty, El::new("p").text(EMPTY_BANNER));

        let edit = doc.append(
            main,
            El::new("section")
                .class("todo__edit")
                .hidden(!self.is_editing()),
        );
        let edit_form = doc.append(edit, El::new("form").id("edit-form"));
        doc.append(
            edit_form,
            El::new("input")
                .attr("type", "text")
                .attr("name", "edit-task")
                .attr("data-field", "edit"),
        );
        doc.append(
            edit_form,
            El::new("button")
                .class("btn btn--save")
                .attr("type", "button")
                .text("Save"),
        );

        doc
    }
}

#[cfg(test)]
mod tests {
    use super::super::selector::Selector;
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn texts(doc: &Document, selector: &str) -> Vec<String> {
        let sel = Selector::parse(selector).unwrap();
        doc.select(&sel)
            .into_iter()
            .map(|id| doc.text_content(id))
            .collect()
    }

    #[test]
    fn test_add_formats_date_and_clears_inputs() {
        let mut app = TodoApp::default();
        app.field_mut(Field::Task).push_str("Купить хлеб");
        app.field_mut(Field::Date).push_str("2025-11-10");
        assert!(app.add(day(2026, 1, 1)));

        let doc = app.render();
        assert_eq!(texts(&doc, ".task__name"), vec!["Купить хлеб"]);
        assert_eq!(texts(&doc, ".task__date"), vec!["10.11.2025"]);
        assert_eq!(texts(&doc, "#task-count"), vec!["1"]);
        assert!(app.field_mut(Field::Task).is_empty());
        assert!(app.field_mut(Field::Date).is_empty());
    }

    #[test]
    fn test_blank_name_is_ignored_and_missing_date_is_today() {
        let mut app = TodoApp::default();
        app.field_mut(Field::Task).push_str("   ");
        assert!(!app.add(day(2026, 1, 1)));
        assert!(app.tasks().is_empty());

        app.field_mut(Field::Task).clear();
        app.field_mut(Field::Task).push_str("  Без даты ");
        assert!(app.add(day(2026, 3, 7)));
        assert_eq!(app.tasks()[0].name, "Без даты");
        assert_eq!(app.tasks()[0].date, day(2026, 3, 7));
    }

    #[test]
    fn test_edit_rejects_empty_name() {
        let mut app = TodoApp::default();
        app.field_mut(Field::Task).push_str("A");
        app.add(day(2026, 1, 1));
        let id = app.tasks()[0].id;

        assert!(app.start_edit(id));
        assert_eq!(app.field_mut(Field::Edit).as_str(), "A");
        app.field_mut(Field::Edit).clear();
        assert_eq!(
            app.save_edit(),
            SaveOutcome::Rejected(EMPTY_NAME_ALERT.to_string())
        );
        assert!(app.is_editing());

        app.field_mut(Field::Edit).push_str("B");
        assert_eq!(app.save_edit(), SaveOutcome::Saved);
        assert!(!app.is_editing());
        assert_eq!(app.tasks()[0].name, "B");
        assert_eq!(app.save_edit(), SaveOutcome::Ignored);
    }

    #[test]
    fn test_persist_round_trip_and_bad_storage() {
        let mut app = TodoApp::default();
        app.field_mut(Field::Task).push_str("A");
        app.add(day(2026, 1, 1));
        app.field_mut(Field::Task).push_str("A");
        app.add(day(2026, 1, 1));

        let mut storage = LocalStorage::new();
        app.persist(&mut storage).unwrap();
        let reloaded = TodoApp::load(&storage);
        assert_eq!(reloaded.tasks(), app.tasks());
        assert_ne!(reloaded.tasks()[0].id, reloaded.tasks()[1].id);

        storage.insert(STORAGE_KEY.to_string(), "{not json".to_string());
        assert!(TodoApp::load(&storage).tasks().is_empty());
    }

    #[test]
    fn test_banner_and_edit_panel_visibility() {
        let mut app = TodoApp::default();
        let doc = app.render();
        let empty = Selector::parse(".todo__empty").unwrap();
        let edit = Selector::parse("section.todo__edit").unwrap();
        assert!(doc.is_displayed(doc.select(&empty)[0]));
        assert!(!doc.is_displayed(doc.select(&edit)[0]));

        app.field_mut(Field::Task).push_str("A");
        app.add(day(2026, 1, 1));
        app.start_edit(app.tasks()[0].id);
        let doc = app.render();
        assert!(!doc.is_displayed(doc.select(&empty)[0]));
        assert!(doc.is_displayed(doc.select(&edit)[0]));
    }
}
