use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::buffer::Buffer;
use ratatui::Terminal;
use tracing::info;

use crate::config::{Config, UiColors};
use crate::guard::{DeleteOutcome, Prompter, UnsavedGuard};
use crate::page::{PostField, PostFlag, PostPage, Submission};
use crate::store::{PostStore, StoreEndpoint};

use super::dialog::TerminalPrompter;
use super::draw;
use super::edit::{EditTarget, InlineEditor};
use super::panes::Pane;

/// Column of the metadata table under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaColumn {
    Key,
    Value,
}

/// Row of the fields pane: a text input or a checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRow {
    Text(PostField),
    Flag(PostFlag),
}

impl FieldRow {
    pub fn all() -> Vec<FieldRow> {
        PostField::ALL
            .into_iter()
            .map(FieldRow::Text)
            .chain(PostFlag::ALL.into_iter().map(FieldRow::Flag))
            .collect()
    }
}

pub struct App<'a> {
    store: &'a PostStore,
    config: &'a Config,
    pub page: PostPage,
    pub focus: Pane,
    pub field_cursor: usize,
    pub meta_cursor: usize,
    pub meta_column: MetaColumn,
    pub file_cursor: usize,
    pub editor: InlineEditor,
    pub status: Option<String>,
    last_frame: Buffer,
}

impl<'a> App<'a> {
    pub fn new(store: &'a PostStore, config: &'a Config, slug: &str) -> Result<Self> {
        let page = load_page(store, config, slug)?;
        Ok(Self {
            store,
            config,
            page,
            focus: Pane::Fields,
            field_cursor: 0,
            meta_cursor: 0,
            meta_column: MetaColumn::Key,
            file_cursor: 0,
            editor: InlineEditor::default(),
            status: None,
            last_frame: Buffer::default(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: Backend,
    {
        loop {
            self.last_frame = draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(terminal, key)? {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    fn handle_key<B: Backend>(&mut self, terminal: &mut Terminal<B>, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits, even with unsaved edits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.editor.active {
            self.handle_editor_key(key);
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                let mut prompter = self.prompter(terminal);
                return self.request_quit(&mut prompter);
            }
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char(c @ '1'..='3') => {
                if let Some(pane) = Pane::from_digit(c) {
                    self.focus = pane;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Left | KeyCode::Char('h') if self.focus == Pane::Meta => {
                self.meta_column = MetaColumn::Key;
            }
            KeyCode::Right | KeyCode::Char('l') if self.focus == Pane::Meta => {
                self.meta_column = MetaColumn::Value;
            }
            KeyCode::Enter | KeyCode::Char('e') => self.start_edit(),
            KeyCode::Char(' ') => self.toggle_selected_flag(),
            KeyCode::Char('s') => self.save()?,
            KeyCode::Char('r') => {
                let mut prompter = self.prompter(terminal);
                self.guarded_reload(&mut prompter)?;
            }
            KeyCode::Char('d') | KeyCode::Delete if self.focus == Pane::Files => {
                self.delete_selected_file(terminal)?;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editor.cancel();
                self.set_status("Edit cancelled");
            }
            KeyCode::Enter => {
                if let Some((target, value)) = self.editor.finish() {
                    self.commit_edit(target, value);
                }
            }
            _ => {
                self.editor.handle_key_event(key);
            }
        }
    }

    fn commit_edit(&mut self, target: EditTarget, value: String) {
        match target {
            EditTarget::Field(field) => {
                self.page.change_field(field, value);
            }
            EditTarget::MetaKey(row) => {
                if self.page.change_meta_key(row, value) {
                    self.set_status("New metadata row");
                }
            }
            EditTarget::MetaValue(row) => {
                self.page.change_meta_value(row, value);
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.focus {
            Pane::Fields => (&mut self.field_cursor, FieldRow::all().len()),
            Pane::Meta => (&mut self.meta_cursor, self.page.meta().len()),
            Pane::Files => (&mut self.file_cursor, self.page.files().len()),
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        let next = (*cursor as isize + delta).clamp(0, len as isize - 1);
        *cursor = next as usize;
    }

    pub fn selected_field_row(&self) -> Option<FieldRow> {
        FieldRow::all().get(self.field_cursor).copied()
    }

    fn start_edit(&mut self) {
        match self.focus {
            Pane::Fields => match self.selected_field_row() {
                Some(FieldRow::Text(field)) => {
                    let current = self.page.field(field).to_string();
                    self.editor.start(&current, EditTarget::Field(field));
                }
                Some(FieldRow::Flag(_)) => self.toggle_selected_flag(),
                None => {}
            },
            Pane::Meta => {
                let Some(row) = self.page.meta().get(self.meta_cursor) else {
                    return;
                };
                let (current, target) = match self.meta_column {
                    MetaColumn::Key => (row.key.clone(), EditTarget::MetaKey(self.meta_cursor)),
                    MetaColumn::Value => {
                        (row.value.clone(), EditTarget::MetaValue(self.meta_cursor))
                    }
                };
                self.editor.start(&current, target);
            }
            Pane::Files => self.set_status("Files are read-only; d deletes the selected file"),
        }
    }

    fn toggle_selected_flag(&mut self) {
        if self.focus != Pane::Fields {
            return;
        }
        if let Some(FieldRow::Flag(flag)) = self.selected_field_row() {
            self.page.toggle_flag(flag);
        }
    }

    fn prompter<'t, B: Backend>(&self, terminal: &'t mut Terminal<B>) -> TerminalPrompter<'t, B> {
        TerminalPrompter::new(terminal, self.last_frame.clone(), self.config.ui.colors)
    }

    fn save(&mut self) -> Result<()> {
        let Submission { mut post, rejected } = self.page.submit();
        self.store.save(&mut post)?;
        info!(slug = %post.slug, "saved post from editor");
        let mut message = format!("saved post {}", post.slug);
        for err in &rejected {
            message.push_str(&format!("; {}", err));
        }
        self.reload(message)
    }

    /// Leaving the editor would drop unsaved edits, so it goes through the guard.
    fn request_quit(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        let allowed = self.page.check_unsaved(prompter)?;
        if !allowed {
            self.set_status("Unsaved changes; s saves, Ctrl+C quits without saving");
        }
        Ok(allowed)
    }

    /// Re-read the post from the store unless that would drop unsaved edits.
    fn guarded_reload(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        if !self.page.check_unsaved(prompter)? {
            self.set_status("Unsaved changes; press s to save");
            return Ok(false);
        }
        self.reload("reloaded")?;
        Ok(true)
    }

    /// Rebuild the page from the store, dropping any unsaved state.
    fn reload(&mut self, message: impl Into<String>) -> Result<()> {
        self.page = load_page(self.store, self.config, self.page.slug())?;
        self.meta_cursor = self.meta_cursor.min(self.page.meta().len().saturating_sub(1));
        self.file_cursor = self.file_cursor.min(self.page.files().len().saturating_sub(1));
        self.set_status(message);
        Ok(())
    }

    fn delete_selected_file<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        if self.page.files().is_empty() {
            self.set_status("No file selected");
            return Ok(());
        }
        let mut prompter = self.prompter(terminal);
        let mut endpoint = StoreEndpoint::new(self.store, self.page.slug());
        let outcome = self
            .page
            .delete_file(self.file_cursor, &mut prompter, &mut endpoint)?;
        match outcome {
            DeleteOutcome::Submitted => {
                let name = self.page.delete_form().name().to_string();
                self.reload(format!("deleted file {}", name))?;
            }
            DeleteOutcome::Declined => self.set_status("Delete cancelled"),
            DeleteOutcome::Blocked => self.set_status("Unsaved changes; press s to save"),
        }
        Ok(())
    }
}

fn load_page(store: &PostStore, config: &Config, slug: &str) -> Result<PostPage> {
    let post = store.get(slug)?;
    let files = store.files(slug)?;
    let guard = UnsavedGuard::new(
        config.messages.unsaved.clone(),
        config.messages.confirm_delete.clone(),
    );
    Ok(PostPage::new(post, files, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Messages, UiConfig};
    use crate::guard::testing::ScriptedPrompter;
    use tempfile::TempDir;
    use url::Url;

    fn fixture() -> (TempDir, PostStore, Config) {
        let dir = TempDir::new().unwrap();
        let posts_dir = dir.path().join("posts");
        let store = PostStore::open(&posts_dir).unwrap();
        let mut post = store.create("hello").unwrap();
        post.title = "Hello".into();
        store.save(&mut post).unwrap();
        let config = Config {
            config_path: dir.path().join("config.toml"),
            posts_dir,
            base_url: Url::parse("http://localhost/admin/").unwrap(),
            page_size: 20,
            log_dir: None,
            messages: Messages::default(),
            ui: UiConfig::default(),
            unknown_keys: Vec::new(),
        };
        (dir, store, config)
    }

    #[test]
    fn test_reload_refused_while_dirty() {
        let (_dir, store, config) = fixture();
        let mut app = App::new(&store, &config, "hello").unwrap();
        app.commit_edit(EditTarget::Field(PostField::Title), "Edited".into());
        assert!(app.page.is_dirty());

        let mut prompter = ScriptedPrompter::default();
        assert!(!app.guarded_reload(&mut prompter).unwrap());
        assert_eq!(prompter.alerts, vec![config.messages.unsaved.clone()]);
        assert!(app.page.is_dirty());
        assert_eq!(app.page.field(PostField::Title), "Edited");
    }

    #[test]
    fn test_reload_when_clean_rereads_store() {
        let (_dir, store, config) = fixture();
        let mut app = App::new(&store, &config, "hello").unwrap();
        let mut post = store.get("hello").unwrap();
        post.title = "Changed elsewhere".into();
        store.save(&mut post).unwrap();

        let mut prompter = ScriptedPrompter::default();
        assert!(app.guarded_reload(&mut prompter).unwrap());
        assert!(prompter.alerts.is_empty());
        assert_eq!(app.page.field(PostField::Title), "Changed elsewhere");
    }

    #[test]
    fn test_quit_refused_while_dirty() {
        let (_dir, store, config) = fixture();
        let mut app = App::new(&store, &config, "hello").unwrap();
        let mut prompter = ScriptedPrompter::default();
        assert!(app.request_quit(&mut prompter).unwrap());

        app.field_cursor = PostField::ALL.len();
        app.toggle_selected_flag();
        assert!(app.page.is_dirty());
        assert!(!app.request_quit(&mut prompter).unwrap());
        assert_eq!(prompter.alerts.len(), 1);
    }

    #[test]
    fn test_save_reports_bad_creation_date() {
        let (_dir, store, config) = fixture();
        let mut app = App::new(&store, &config, "hello").unwrap();
        let stored = store.get("hello").unwrap().creation;
        app.commit_edit(EditTarget::Field(PostField::Creation), "soon".into());
        app.commit_edit(EditTarget::Field(PostField::Title), "Saved".into());

        app.save().unwrap();
        assert!(!app.page.is_dirty());
        let post = store.get("hello").unwrap();
        assert_eq!(post.title, "Saved");
        assert_eq!(post.creation, stored);
        assert!(app.status.as_deref().unwrap().contains("invalid creation date"));
    }
}
