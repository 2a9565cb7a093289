use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::page::PostField;

/// Which input an inline edit will be committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Field(PostField),
    MetaKey(usize),
    MetaValue(usize),
}

#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<EditTarget>,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: EditTarget) {
        self.active = true;
        self.target = Some(target);
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.input.reset();
    }

    /// Close the editor, handing back the target and the typed value.
    pub fn finish(&mut self) -> Option<(EditTarget, String)> {
        let target = self.target.take()?;
        let value = self.input.value().to_string();
        self.cancel();
        Some((target, value))
    }

    pub fn target(&self) -> Option<EditTarget> {
        self.target
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_typing_and_finish() {
        let mut editor = InlineEditor::default();
        editor.start("ab", EditTarget::MetaKey(0));
        editor.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert_eq!(editor.value(), "abc");

        assert_eq!(
            editor.finish(),
            Some((EditTarget::MetaKey(0), "abc".to_string()))
        );
        assert!(!editor.active);
        assert_eq!(editor.finish(), None);
    }
}
