pub mod dialog;
pub mod terminal;

use crate::error::ProxyResult;

pub use dialog::DialogResolver;
pub use terminal::TerminalResolver;

/// Asks the operator which proxy a newly seen network should use.
pub trait Resolver: Send {
    /// Block until the operator answers. `None` means the answer was blank
    /// or the prompt was dismissed; the two are not distinguished.
    fn prompt(&mut self, label: &str) -> ProxyResult<Option<String>>;
}

/// Body text shown for a network called `label`
pub fn prompt_message(label: &str) -> String {
    format!("Enter proxy for {label} (ip:port), leave blank for no proxy:")
}

/// Trim an answer and collapse blank input to `None`
pub fn normalize_answer(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
