use console::Style;
use once_cell::sync::Lazy;

pub static ERROR: Lazy<Style> = Lazy::new(|| Style::new().red().bold().for_stderr());
pub static WARNING: Lazy<Style> = Lazy::new(|| Style::new().yellow().for_stderr());
pub static DEBUG: Lazy<Style> = Lazy::new(|| Style::new().dim().for_stderr());
pub static PROMPT: Lazy<Style> = Lazy::new(|| Style::new().bold().for_stderr());

pub static TABLE_TITLE: Lazy<Style> = Lazy::new(|| Style::new().bold().underlined());
