use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::Terminal;
use tui_widgets::popup::PopupState;

use crate::config::UiColors;
use crate::guard::Prompter;

use super::draw;

const ALERT_HELP: &str = "Enter/Esc: dismiss";
const CONFIRM_HELP: &str = "y/Enter: yes  n/Esc: no";

/// Blocking modal dialogs drawn over the last rendered frame. Each call runs
/// its own event loop and only returns once the user has answered.
pub struct TerminalPrompter<'t, B: Backend> {
    terminal: &'t mut Terminal<B>,
    backdrop: Buffer,
    colors: UiColors,
    popup: PopupState,
}

impl<'t, B: Backend> TerminalPrompter<'t, B> {
    pub fn new(terminal: &'t mut Terminal<B>, backdrop: Buffer, colors: UiColors) -> Self {
        Self {
            terminal,
            backdrop,
            colors,
            popup: PopupState::default(),
        }
    }

    fn show(&mut self, title: &str, message: &str, help: &str) -> Result<()> {
        let backdrop = &self.backdrop;
        let colors = &self.colors;
        let popup = &mut self.popup;
        self.terminal.draw(|frame| {
            frame.buffer_mut().merge(backdrop);
            draw::draw_dialog(frame, title, message, help, colors, popup);
        })?;
        Ok(())
    }
}

enum Answer {
    Yes,
    No,
}

fn read_answer() -> Result<Answer> {
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(Answer::No);
        }
        match key.code {
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(Answer::Yes),
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('q') => {
                return Ok(Answer::No)
            }
            _ => {}
        }
    }
}

impl<B: Backend> Prompter for TerminalPrompter<'_, B> {
    fn alert(&mut self, message: &str) -> Result<()> {
        self.show("WARNING", message, ALERT_HELP)?;
        read_answer()?;
        Ok(())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.show("CONFIRM", message, CONFIRM_HELP)?;
        Ok(matches!(read_answer()?, Answer::Yes))
    }
}
