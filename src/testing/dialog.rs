//! Dialog stubs installed by the runner
//!
//! The runner hands one [`DialogStubs`] to the browser as its
//! [`DialogHandler`]. Each `stub_dialog` step queues a stub; a dialog consumes
//! the oldest queued stub of its kind, or the oldest of any kind when the
//! backend cannot tell the kind.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::browser::{Dialog, DialogHandler, DialogKind};
use crate::common::{Error, Result};

use super::config::DialogStub;

/// A dialog the page raised during the scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredDialog {
    pub kind: Option<DialogKind>,
    pub message: String,
    /// Answer given to the page
    pub accepted: bool,
    /// The stub that answered, if any
    pub stub: Option<DialogStub>,
}

#[derive(Default)]
struct StubState {
    pending: VecDeque<DialogStub>,
    fired: Vec<FiredDialog>,
}

/// Queue of dialog stubs for the running scenario
#[derive(Default)]
pub struct DialogStubs {
    state: Mutex<StubState>,
}

impl DialogStubs {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        // A panic while holding the lock leaves plain data behind
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a stub for the next matching dialog
    pub fn install(&self, stub: DialogStub) {
        self.lock().pending.push_back(stub);
    }

    /// Forget stubs and recorded dialogs
    pub fn reset(&self) {
        let mut state = self.lock();
        state.pending.clear();
        state.fired.clear();
    }

    /// Dialogs raised so far, in order
    pub fn fired(&self) -> Vec<FiredDialog> {
        self.lock().fired.clone()
    }

    /// Check that every stub fired and every alert said what was expected
    pub fn verify(&self) -> Result<()> {
        let state = self.lock();
        if let Some(stub) = state.pending.front() {
            return Err(Error::DialogNotTriggered {
                kind: stub.kind().to_string(),
            });
        }
        for fired in &state.fired {
            if let Some(DialogStub::Alert {
                expect_message: Some(expected),
            }) = &fired.stub
            {
                if !fired.message.contains(expected.as_str()) {
                    return Err(Error::assertion_failed(
                        "alert",
                        format!("message containing '{}'", expected),
                        format!("'{}'", fired.message),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl DialogHandler for DialogStubs {
    fn handle(&self, dialog: &Dialog) -> bool {
        let mut state = self.lock();
        let position = match dialog.kind {
            Some(kind) => state.pending.iter().position(|s| s.kind() == kind),
            None if state.pending.is_empty() => None,
            None => Some(0),
        };
        let stub = position.and_then(|i| state.pending.remove(i));

        let accepted = match &stub {
            Some(DialogStub::Confirm { returns }) => *returns,
            Some(DialogStub::Alert { .. }) => true,
            None => {
                tracing::warn!(
                    "Unstubbed {} dialog '{}' accepted",
                    dialog.kind.map_or("unknown".to_string(), |k| k.to_string()),
                    dialog.message
                );
                true
            }
        };
        tracing::debug!("Dialog '{}' answered with {}", dialog.message, accepted);

        state.fired.push(FiredDialog {
            kind: dialog.kind,
            message: dialog.message.clone(),
            accepted,
            stub,
        });
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialog(kind: Option<DialogKind>, message: &str) -> Dialog {
        Dialog {
            kind,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_confirm_stub_answers_once() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Confirm { returns: false });

        assert!(!stubs.handle(&dialog(Some(DialogKind::Confirm), "sure?")));
        // The stub was consumed; the next confirm gets the default answer
        assert!(stubs.handle(&dialog(Some(DialogKind::Confirm), "sure?")));
        assert!(stubs.verify().is_ok());
        assert_eq!(stubs.fired().len(), 2);
    }

    #[test]
    fn test_stub_matches_by_kind() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Alert {
            expect_message: None,
        });
        stubs.install(DialogStub::Confirm { returns: false });

        assert!(!stubs.handle(&dialog(Some(DialogKind::Confirm), "sure?")));
        let err = stubs.verify().unwrap_err();
        assert!(matches!(err, Error::DialogNotTriggered { ref kind } if kind == "alert"));
    }

    #[test]
    fn test_unknown_kind_takes_oldest_stub() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Confirm { returns: false });
        assert!(!stubs.handle(&dialog(None, "sure?")));
        assert!(stubs.verify().is_ok());
    }

    #[test]
    fn test_alert_message_is_checked() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Alert {
            expect_message: Some("пустым".into()),
        });
        stubs.handle(&dialog(Some(DialogKind::Alert), "Что-то другое"));
        let err = stubs.verify().unwrap_err();
        assert!(matches!(err, Error::AssertionFailed { .. }));

        stubs.reset();
        stubs.install(DialogStub::Alert {
            expect_message: Some("пустым".into()),
        });
        stubs.handle(&dialog(
            Some(DialogKind::Alert),
            "Название задачи не может быть пустым!",
        ));
        assert!(stubs.verify().is_ok());
    }

    #[test]
    fn test_fired_dialogs_record_the_answering_stub() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Confirm { returns: false });
        stubs.handle(&dialog(Some(DialogKind::Confirm), "Удалить все задачи?"));
        stubs.handle(&dialog(Some(DialogKind::Alert), "hi"));

        assert_eq!(
            stubs.fired(),
            vec![
                FiredDialog {
                    kind: Some(DialogKind::Confirm),
                    message: "Удалить все задачи?".to_string(),
                    accepted: false,
                    stub: Some(DialogStub::Confirm { returns: false }),
                },
                FiredDialog {
                    kind: Some(DialogKind::Alert),
                    message: "hi".to_string(),
                    accepted: true,
                    stub: None,
                },
            ]
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let stubs = DialogStubs::new();
        stubs.install(DialogStub::Confirm { returns: true });
        stubs.handle(&dialog(Some(DialogKind::Alert), "hi"));
        stubs.reset();
        assert!(stubs.fired().is_empty());
        assert!(stubs.verify().is_ok());
    }
}
