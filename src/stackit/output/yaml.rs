//! YAML emission.
//!
//! serde_yaml writes block sequences flush with their parent key:
//!
//! ```text
//! staticConfigs:
//! - targets:
//!   - url-target
//! ```
//!
//! The output is re-indented so sequences nest under their key:
//!
//! ```text
//! staticConfigs:
//!   - targets:
//!       - url-target
//! ```
//!
//! Only indentation changes, so the document decodes to the same value.

use crate::error::Result;
use serde::Serialize;

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let raw = serde_yaml::to_string(value)?;
    Ok(indent_sequences(&raw))
}

/// Column where the content of a line starts once its `- ` markers are
/// skipped, e.g. `  - - key:` → 6.
fn content_column(line: &str) -> usize {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let mut rest = &line[indent..];
    let mut column = indent;
    while let Some(stripped) = rest.strip_prefix("- ") {
        rest = stripped;
        column += 2;
    }
    column
}

fn is_sequence_item(trimmed: &str) -> bool {
    trimmed == "-" || trimmed.starts_with("- ")
}

/// A mapping key that opens a nested block (`key:` with nothing after it).
fn opens_block(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.ends_with(':') && !trimmed.trim_start().starts_with('#')
}

/// Block scalar header such as `key: |-` or `- >`.
fn opens_block_scalar(line: &str) -> bool {
    let trimmed = line.trim_end();
    let last = trimmed.rsplit(' ').next().unwrap_or("");
    last.starts_with('|') || last.starts_with('>')
}

pub fn indent_sequences(yaml: &str) -> String {
    // Each entry is the original column of a sequence that gets shifted.
    let mut shifted: Vec<usize> = Vec::new();
    let mut previous_key_column: Option<usize> = None;
    // Original indentation owning an active block scalar.
    let mut scalar_owner: Option<usize> = None;
    let mut out = String::with_capacity(yaml.len() + yaml.len() / 4);

    for line in yaml.lines() {
        if line.trim().is_empty() {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let indent = line.len() - line.trim_start_matches(' ').len();
        let trimmed = &line[indent..];

        if let Some(owner) = scalar_owner {
            if indent > owner {
                let shift = 2 * shifted.iter().filter(|&&s| s < indent).count();
                out.push_str(&" ".repeat(shift));
                out.push_str(line);
                out.push('\n');
                continue;
            }
            scalar_owner = None;
        }

        let item = is_sequence_item(trimmed);
        while let Some(&top) = shifted.last() {
            if indent > top || (indent == top && item) {
                break;
            }
            shifted.pop();
        }
        if item && previous_key_column == Some(indent) && shifted.last() != Some(&indent) {
            shifted.push(indent);
        }

        out.push_str(&" ".repeat(2 * shifted.len()));
        out.push_str(line);
        out.push('\n');

        previous_key_column = if opens_block(line) {
            Some(content_column(line))
        } else {
            None
        };
        if opens_block_scalar(line) {
            scalar_owner = Some(indent);
        }
    }
    out
}
