//! Unsaved-changes guard for the post editor.
//!
//! Destructive actions that reload the page (deleting an attached file)
//! would silently drop pending edits, so they are refused once the form is
//! dirty.

use anyhow::Result;
use tracing::{debug, info};

pub const DEFAULT_UNSAVED_MESSAGE: &str = "Please save post first!";
pub const DEFAULT_CONFIRM_MESSAGE: &str = "Are you sure?";

/// Blocking user dialogs.
pub trait Prompter {
    /// Show a warning and wait until it is dismissed.
    fn alert(&mut self, message: &str) -> Result<()>;

    /// Ask a yes/no question and wait for the answer.
    fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Receiver of a submitted delete form.
pub trait DeleteEndpoint {
    fn submit_delete(&mut self, name: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Clean,
    Dirty,
}

/// Hidden delete form; `name` is the `delete-name` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteForm {
    name: String,
}

impl DeleteForm {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Refused because the form has unsaved edits.
    Blocked,
    /// The user answered no.
    Declined,
    /// The delete form was sent.
    Submitted,
}

#[derive(Debug, Clone)]
pub struct UnsavedGuard {
    state: GuardState,
    unsaved_message: String,
    confirm_message: String,
}

impl Default for UnsavedGuard {
    fn default() -> Self {
        Self::new(DEFAULT_UNSAVED_MESSAGE, DEFAULT_CONFIRM_MESSAGE)
    }
}

impl UnsavedGuard {
    pub fn new(unsaved_message: impl Into<String>, confirm_message: impl Into<String>) -> Self {
        Self {
            state: GuardState::Clean,
            unsaved_message: unsaved_message.into(),
            confirm_message: confirm_message.into(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state == GuardState::Dirty
    }

    /// Record a change event on a tracked field. There is no way back.
    pub fn mark_changed(&mut self) {
        if self.state == GuardState::Clean {
            debug!("post form is now dirty");
        }
        self.state = GuardState::Dirty;
    }

    /// True when it is safe to proceed; warns the user otherwise.
    pub fn check_unsaved(&self, prompter: &mut dyn Prompter) -> Result<bool> {
        if self.is_dirty() {
            prompter.alert(&self.unsaved_message)?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Guarded file deletion. `preceding` is the label of the row right
    /// before the delete control, i.e. the file name.
    pub fn delete_file(
        &self,
        preceding: &str,
        form: &mut DeleteForm,
        prompter: &mut dyn Prompter,
        endpoint: &mut dyn DeleteEndpoint,
    ) -> Result<DeleteOutcome> {
        if !self.check_unsaved(prompter)? {
            return Ok(DeleteOutcome::Blocked);
        }
        form.name = preceding.to_string();
        if !prompter.confirm(&self.confirm_message)? {
            return Ok(DeleteOutcome::Declined);
        }
        info!(name = %form.name, "submitting delete form");
        endpoint.submit_delete(&form.name)?;
        Ok(DeleteOutcome::Submitted)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Scripted prompter recording every dialog it was asked to show.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        pub answer: bool,
        pub alerts: Vec<String>,
        pub confirms: Vec<String>,
    }

    impl ScriptedPrompter {
        pub fn answering(answer: bool) -> Self {
            Self {
                answer,
                ..Self::default()
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn alert(&mut self, message: &str) -> Result<()> {
            self.alerts.push(message.to_string());
            Ok(())
        }

        fn confirm(&mut self, message: &str) -> Result<bool> {
            self.confirms.push(message.to_string());
            Ok(self.answer)
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingEndpoint {
        pub submitted: Vec<String>,
    }

    impl DeleteEndpoint for RecordingEndpoint {
        fn submit_delete(&mut self, name: &str) -> Result<()> {
            self.submitted.push(name.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingEndpoint, ScriptedPrompter};
    use super::*;

    #[test]
    fn test_clean_guard_permits() {
        let guard = UnsavedGuard::default();
        let mut prompter = ScriptedPrompter::default();
        assert!(guard.check_unsaved(&mut prompter).unwrap());
        assert!(prompter.alerts.is_empty());
    }

    #[test]
    fn test_dirty_guard_denies_for_good() {
        let mut guard = UnsavedGuard::default();
        guard.mark_changed();
        guard.mark_changed();
        let mut prompter = ScriptedPrompter::default();

        assert!(!guard.check_unsaved(&mut prompter).unwrap());
        assert!(!guard.check_unsaved(&mut prompter).unwrap());
        assert!(guard.is_dirty());
        assert_eq!(prompter.alerts, vec![DEFAULT_UNSAVED_MESSAGE; 2]);
    }

    #[test]
    fn test_delete_when_dirty_never_prompts() {
        let mut guard = UnsavedGuard::default();
        guard.mark_changed();
        let mut form = DeleteForm::default();
        let mut prompter = ScriptedPrompter::answering(true);
        let mut endpoint = RecordingEndpoint::default();

        let outcome = guard
            .delete_file("cover.png", &mut form, &mut prompter, &mut endpoint)
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Blocked);
        assert!(prompter.confirms.is_empty());
        assert!(endpoint.submitted.is_empty());
        assert_eq!(form.name(), "");
    }

    #[test]
    fn test_delete_declined() {
        let guard = UnsavedGuard::default();
        let mut form = DeleteForm::default();
        let mut prompter = ScriptedPrompter::answering(false);
        let mut endpoint = RecordingEndpoint::default();

        let outcome = guard
            .delete_file("cover.png", &mut form, &mut prompter, &mut endpoint)
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(prompter.confirms, vec![DEFAULT_CONFIRM_MESSAGE]);
        assert!(endpoint.submitted.is_empty());
    }

    #[test]
    fn test_delete_confirmed_submits_once() {
        let guard = UnsavedGuard::new("save first", "really?");
        let mut form = DeleteForm::default();
        let mut prompter = ScriptedPrompter::answering(true);
        let mut endpoint = RecordingEndpoint::default();

        let outcome = guard
            .delete_file("img/cover.png", &mut form, &mut prompter, &mut endpoint)
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Submitted);
        assert_eq!(form.name(), "img/cover.png");
        assert_eq!(prompter.confirms, vec!["really?"]);
        assert_eq!(endpoint.submitted, vec!["img/cover.png"]);
    }
}
