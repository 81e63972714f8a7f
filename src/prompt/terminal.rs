use std::io::{self, Stdout};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::{Terminal, TerminalOptions, Viewport};

use super::{normalize_answer, prompt_message, Resolver};
use crate::error::{ProxyError, ProxyResult};
use crate::ui::input_dialog::{InputAction, InputDialog, DIALOG_HEIGHT};

/// Inline prompt drawn below the cursor of the terminal the process runs in.
/// Enter saves, Esc / Ctrl+C dismiss (recorded as no proxy).
#[derive(Debug, Clone)]
pub struct TerminalResolver {
    title: String,
}

impl TerminalResolver {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl Resolver for TerminalResolver {
    fn prompt(&mut self, label: &str) -> ProxyResult<Option<String>> {
        let mut dialog = InputDialog::new(&self.title, &prompt_message(label));

        enable_raw_mode().map_err(|e| ProxyError::Prompt(format!("terminal unavailable: {e}")))?;
        let result = run_dialog(&mut dialog);
        // Restore the terminal even when drawing failed
        let restored = disable_raw_mode();

        let answer = result.map_err(|e| ProxyError::Prompt(format!("terminal prompt failed: {e}")))?;
        restored?;
        Ok(answer)
    }
}

fn run_dialog(dialog: &mut InputDialog) -> io::Result<Option<String>> {
    let mut terminal: Terminal<CrosstermBackend<Stdout>> = Terminal::with_options(
        CrosstermBackend::new(io::stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(DIALOG_HEIGHT),
        },
    )?;

    let answer = loop {
        terminal.draw(|f| dialog.render(f, f.area()))?;

        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => continue,
        };
        match dialog.handle_key(key) {
            InputAction::Continue => {}
            InputAction::Submit => break normalize_answer(dialog.value()),
            InputAction::Cancel => break None,
        }
    };

    terminal.clear()?;
    Ok(answer)
}
