use ratatui::style::{Color, Modifier, Style};

// ─── Color Palette (terminal-adaptive, transparency-friendly) ──────────

/// Background: always Reset, keeps the terminal's own background
pub const BG: Color = Color::Reset;

/// Primary text color
pub const FG: Color = Color::White;

/// Dimmed text (labels, hints)
pub const FG_DIM: Color = Color::DarkGray;

/// Accent color (title, prompt marker, key hints)
pub const ACCENT: Color = Color::Cyan;

/// Border color of the prompt box
pub const BORDER: Color = Color::Cyan;

// ─── Style Constructors ──────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(FG).bg(BG)
}

pub fn style_dim() -> Style {
    Style::default().fg(FG_DIM).bg(BG)
}

pub fn style_accent() -> Style {
    Style::default().fg(ACCENT).bg(BG)
}

pub fn style_accent_bold() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(BG)
        .add_modifier(Modifier::BOLD)
}

pub fn style_border() -> Style {
    Style::default().fg(BORDER).bg(BG)
}

pub fn style_key_hint() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(BG)
        .add_modifier(Modifier::BOLD)
}

pub fn style_key_desc() -> Style {
    Style::default().fg(FG_DIM).bg(BG)
}
