//! Built-in to-do app suite
//!
//! The nine end-to-end scenarios for the to-do app, expressed with the
//! scenario builders so they run without any YAML on disk.

use crate::browser::sim::app::{EMPTY_NAME_ALERT, STORAGE_KEY};

use super::config::{Assertion, Scenario, Step, TextMatcher, TextScope, TODAY_PLACEHOLDER};

/// Selectors of the app under test
pub mod selectors {
    pub const TASK_INPUT: &str = r#"input[name="task"]"#;
    pub const DATE_INPUT: &str = r#"input[name="date"]"#;
    pub const ADD_BUTTON: &str = ".btn--add";
    pub const TASK_ITEMS: &str = "#tasks-container li.task";
    pub const TASK_NAME: &str = ".task__name";
    pub const TASK_DATE: &str = ".task__date";
    pub const ITEM_NAMES: &str = "#tasks-container li.task .task__name";
    pub const ITEM_DATES: &str = "#tasks-container .task__date";
    pub const ANY_TASK: &str = "#tasks-container .task";
    pub const TASK_COUNT: &str = "#task-count";
    pub const DELETE_ALL: &str = ".btn--delete-all";
    pub const EMPTY_SECTION: &str = ".todo__empty";
    pub const EMPTY_BANNER: &str = ".todo__empty p";
    pub const EDIT_BUTTON: &str = ".btn--edit";
    pub const EDIT_SECTION: &str = "section.todo__edit";
    pub const EDIT_INPUT: &str = r#"#edit-form input[type="text"]"#;
    pub const SAVE_BUTTON: &str = ".btn--save";
}

use selectors::*;

/// Every scenario of the suite, in run order
pub fn todo_app_suite() -> Vec<Scenario> {
    vec![
        add_and_reload(),
        delete_all_confirmed(),
        delete_all_declined(),
        edit_task(),
        blank_name_ignored(),
        long_name(),
        duplicates_allowed(),
        empty_date_is_today(),
        edit_to_empty_name_rejected(),
    ]
}

fn add(name: &str) -> [Step; 2] {
    [Step::type_text(TASK_INPUT, name), Step::click(ADD_BUTTON)]
}

fn with_steps(scenario: Scenario, steps: impl IntoIterator<Item = Step>) -> Scenario {
    steps.into_iter().fold(scenario, Scenario::step)
}

fn add_and_reload() -> Scenario {
    Scenario::new("adds a task and keeps it after reload")
        .step(Step::type_text(TASK_INPUT, "Купить хлеб"))
        .step(Step::type_text(DATE_INPUT, "2025-11-10"))
        .step(Step::click(ADD_BUTTON))
        .step(Step::wait_for(Assertion::count(TASK_ITEMS, 1)))
        .step(Step::wait_for(Assertion::text_in(
            TASK_NAME,
            TextMatcher::equals("Купить хлеб"),
            TextScope::First,
        )))
        .step(Step::wait_for(Assertion::text_in(
            TASK_DATE,
            TextMatcher::contains("10.11.2025"),
            TextScope::First,
        )))
        .step(Step::Reload)
        .assert(Assertion::count(TASK_ITEMS, 1))
        .assert(Assertion::text(ITEM_NAMES, TextMatcher::contains("Купить хлеб")))
}

fn two_tasks(name: &str) -> Scenario {
    let scenario = with_steps(Scenario::new(name), add("A"));
    with_steps(scenario, add("B")).step(Step::wait_for(Assertion::count(TASK_ITEMS, 2)))
}

fn delete_all_confirmed() -> Scenario {
    two_tasks("deletes every task when confirmed")
        .step(Step::confirm(true))
        .step(Step::click(DELETE_ALL))
        .assert(Assertion::count(ANY_TASK, 0))
        .assert(Assertion::text(TASK_COUNT, TextMatcher::contains("0")))
        .assert(Assertion::visible(EMPTY_SECTION, true))
        .assert(Assertion::text(
            EMPTY_BANNER,
            TextMatcher::contains("u don't have any tasks yet :("),
        ))
        .assert(Assertion::storage_len(STORAGE_KEY, 0))
}

fn delete_all_declined() -> Scenario {
    two_tasks("keeps the tasks when deletion is declined")
        .step(Step::confirm(false))
        .step(Step::click(DELETE_ALL))
        .assert(Assertion::count(ANY_TASK, 2))
        .assert(Assertion::text(TASK_COUNT, TextMatcher::contains("2")))
        .assert(Assertion::visible(EMPTY_SECTION, false))
        .assert(Assertion::storage_len(STORAGE_KEY, 2))
}

fn edit_task() -> Scenario {
    with_steps(Scenario::new("edits a task and saves the change"), add("Почитать книгу"))
        .step(Step::wait_for(Assertion::text(
            TASK_NAME,
            TextMatcher::contains("Почитать книгу"),
        )))
        .step(Step::click(EDIT_BUTTON))
        .step(Step::wait_for(Assertion::visible(EDIT_SECTION, true)))
        .step(Step::clear(EDIT_INPUT))
        .step(Step::type_text(EDIT_INPUT, "Почитать 2 главы"))
        .step(Step::click(SAVE_BUTTON))
        .assert(Assertion::text(
            TASK_NAME,
            TextMatcher::contains("Почитать 2 главы"),
        ))
        .assert(Assertion::visible(EDIT_SECTION, false))
}

fn blank_name_ignored() -> Scenario {
    Scenario::new("ignores a blank or whitespace-only name")
        .step(Step::clear(TASK_INPUT))
        .step(Step::type_text(TASK_INPUT, "   "))
        .step(Step::click(ADD_BUTTON))
        .assert(Assertion::count(TASK_ITEMS, 0))
}

fn long_name() -> Scenario {
    let name = "X".repeat(1000);
    with_steps(Scenario::new("shows a very long name intact"), add(&name))
        .assert(Assertion::count(TASK_ITEMS, 1))
        .assert(Assertion::visible(TASK_ITEMS, true))
        .assert(Assertion::text_in(
            TASK_NAME,
            TextMatcher::contains("XXXXX"),
            TextScope::First,
        ))
        .assert(Assertion::text_in(
            TASK_NAME,
            TextMatcher::MinLength(100),
            TextScope::First,
        ))
}

fn duplicates_allowed() -> Scenario {
    let scenario = with_steps(Scenario::new("allows duplicate tasks"), add("Помыть посуду"));
    with_steps(scenario, add("Помыть посуду"))
        .assert(Assertion::count(TASK_ITEMS, 2))
        .assert(Assertion::text_in(
            TASK_ITEMS,
            TextMatcher::contains("Помыть посуду"),
            TextScope::Every,
        ))
}

fn empty_date_is_today() -> Scenario {
    with_steps(Scenario::new("uses today's date when none is given"), add("Без даты")).assert(
        Assertion::text(ITEM_DATES, TextMatcher::contains(TODAY_PLACEHOLDER)),
    )
}

fn edit_to_empty_name_rejected() -> Scenario {
    with_steps(
        Scenario::new("refuses to save an empty name"),
        add("Проверка пустого имени"),
    )
    .step(Step::click(EDIT_BUTTON))
    .step(Step::wait_for(Assertion::visible(EDIT_SECTION, true)))
    .step(Step::clear(EDIT_INPUT))
    .step(Step::alert(Some(EMPTY_NAME_ALERT)))
    .step(Step::click(SAVE_BUTTON))
    .assert(Assertion::visible(EDIT_SECTION, true))
    .assert(Assertion::text(
        TASK_NAME,
        TextMatcher::contains("Проверка пустого имени"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::DialogKind;
    use crate::testing::config::DialogStub;

    #[test]
    fn test_suite_has_nine_named_scenarios() {
        let suite = todo_app_suite();
        assert_eq!(suite.len(), 9);
        let mut names: Vec<_> = suite.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_dialog_stubs_precede_their_trigger() {
        for scenario in todo_app_suite() {
            for (i, step) in scenario.steps.iter().enumerate() {
                if let Step::StubDialog(stub) = step {
                    let trigger = &scenario.steps[i + 1];
                    let expected = match stub.kind() {
                        DialogKind::Confirm => DELETE_ALL,
                        DialogKind::Alert => SAVE_BUTTON,
                    };
                    assert_eq!(trigger, &Step::click(expected), "{}", scenario.name);
                }
            }
        }
    }

    #[test]
    fn test_storage_checks_use_the_app_key() {
        let keys: Vec<String> = todo_app_suite()
            .iter()
            .flat_map(|s| s.assertions.iter())
            .filter_map(|a| match a {
                Assertion::StorageJsonLength { key, .. } => Some(key.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["tasks".to_string(), "tasks".to_string()]);
    }

    #[test]
    fn test_empty_name_scenario_expects_alert() {
        let scenario = edit_to_empty_name_rejected();
        assert!(scenario.steps.contains(&Step::StubDialog(DialogStub::Alert {
            expect_message: Some(EMPTY_NAME_ALERT.to_string()),
        })));
    }
}
