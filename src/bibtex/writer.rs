//! BibTeX formatting.
//!
//! Turns normalized records back into BibTeX text.

use crate::normalize::NormalizedRecord;

/// Format a single entry.
pub fn format_entry(entry: &NormalizedRecord) -> String {
    let mut result = String::new();

    result.push('@');
    result.push_str(&entry.entry_type);
    result.push('{');
    result.push_str(&entry.id);
    result.push_str(",\n");

    for (name, value) in &entry.fields {
        result.push_str("  ");
        result.push_str(name);
        result.push_str(" = ");
        result.push_str(&format_field_value(value));
        result.push_str(",\n");
    }

    result.push('}');
    result
}

/// Format entries into one bibliography body: entries separated by a blank
/// line, terminated by a newline. No entries give an empty string.
pub fn format_entries<'a>(entries: impl IntoIterator<Item = &'a NormalizedRecord>) -> String {
    let mut result = String::new();
    for entry in entries {
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&format_entry(entry));
        result.push('\n');
    }
    result
}

/// Purely numeric values are written bare, everything else braced so that
/// LaTeX markup survives. A value whose braces do not pair up has them
/// escaped, otherwise it would close the field early.
fn format_field_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        return value.to_string();
    }

    let mut result = String::with_capacity(value.len() + 2);
    result.push('{');
    if braces_balanced(value) {
        result.push_str(value);
    } else {
        result.push_str(&escape_braces(value));
    }
    result.push('}');
    result
}

/// Whether every unescaped `{` has a matching `}` after it.
fn braces_balanced(value: &str) -> bool {
    let mut depth = 0usize;
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn escape_braces(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 4);
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                escaped.push(c);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
