use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::ui::theme;

/// Rows the dialog needs: border, prompt, input, hint, border
pub const DIALOG_HEIGHT: u16 = 5;

/// What a key press did to the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Continue,
    Submit,
    Cancel,
}

/// State for a single-line text input dialog (the proxy endpoint prompt).
/// `cursor_pos` counts characters, not bytes.
#[derive(Debug, Clone)]
pub struct InputDialog {
    pub title: String,
    pub prompt: String,
    pub input: String,
    pub cursor_pos: usize,
}

impl InputDialog {
    pub fn new(title: &str, prompt: &str) -> Self {
        Self {
            title: title.to_string(),
            prompt: prompt.to_string(),
            input: String::new(),
            cursor_pos: 0,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_pos);
        self.input.insert(at, c);
        self.cursor_pos += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let at = self.byte_index(self.cursor_pos);
            self.input.remove(at);
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor_pos < self.char_count() {
            let at = self.byte_index(self.cursor_pos);
            self.input.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.char_count() {
            self.cursor_pos += 1;
        }
    }

    pub fn move_start(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.char_count();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    pub fn value(&self) -> &str {
        &self.input
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: KeyEvent) -> InputAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return InputAction::Submit,
            KeyCode::Esc => return InputAction::Cancel,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return InputAction::Cancel,
            KeyCode::Char('u') if ctrl => self.clear(),
            KeyCode::Char('a') if ctrl => self.move_start(),
            KeyCode::Char('e') if ctrl => self.move_end(),
            KeyCode::Char(c) if !ctrl => self.insert_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.move_start(),
            KeyCode::End => self.move_end(),
            _ => {}
        }
        InputAction::Continue
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        f.render_widget(Clear, area);

        let block = Block::default()
            .title(Line::from(vec![
                Span::styled(" ", theme::style_accent()),
                Span::styled(format!("{} ", self.title), theme::style_accent_bold()),
            ]))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::style_border())
            .style(theme::style_default());

        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let prompt = Paragraph::new(Line::from(Span::styled(&self.prompt, theme::style_dim())));
        f.render_widget(prompt, chunks[0]);

        let input_line = Line::from(vec![
            Span::styled("❯ ", theme::style_accent()),
            Span::styled(self.input.as_str(), theme::style_default()),
        ]);
        f.render_widget(Paragraph::new(input_line), chunks[1]);

        // Place cursor after the text left of it, by display width
        let before = &self.input[..self.byte_index(self.cursor_pos)];
        let cursor_x = chunks[1].x + 2 + before.width() as u16;
        f.set_cursor_position((cursor_x.min(chunks[1].right().saturating_sub(1)), chunks[1].y));

        let hints = Line::from(vec![
            Span::styled("[Enter]", theme::style_key_hint()),
            Span::styled(" Save  ", theme::style_key_desc()),
            Span::styled("[Esc]", theme::style_key_hint()),
            Span::styled(" No proxy", theme::style_key_desc()),
        ]);
        f.render_widget(Paragraph::new(hints), chunks[2]);
    }

    fn char_count(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
