pub mod input_dialog;
pub mod theme;
