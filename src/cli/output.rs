// src/cli/output.rs

use crate::models::Value;
use colored::{ColoredString, Colorize};
use serde::Serialize;

/// Renders a command result for printing; `None` results print nothing.
///
/// Results are rendered as JSON indented by four spaces, unless `raw` is set
/// or serialization fails, in which case the plain display form is used.
pub fn render_result(value: &Value, raw: bool) -> Option<String> {
    if value.is_none() {
        return None;
    }
    if raw {
        return Some(value.to_string());
    }
    Some(to_pretty_json(value).unwrap_or_else(|e| {
        log::debug!("Falling back to plain output: {}", e);
        value.to_string()
    }))
}

fn to_pretty_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Prints a command result to stdout.
pub fn print_result(value: &Value, raw: bool) {
    if let Some(text) = render_result(value, raw) {
        println!("{}", text);
    }
}

/// Prints a one-line warning to stderr.
pub fn warn(message: &str) {
    eprintln!("{}", message.red());
}

/// Bold cyan, as used by the `--cli` report.
pub fn highlight(text: &str) -> ColoredString {
    text.cyan().bold()
}

/// The lines printed by `--cli`.
pub fn cli_info_lines(program: &str, version: Option<&str>, executable_path: &str) -> Vec<String> {
    let name = match version {
        Some(v) => format!("{} (version {})", program, v),
        None => program.to_string(),
    };
    vec![
        format!("Executable:           {}", highlight(&name)),
        format!("Executable path:      {}", highlight(executable_path)),
        format!("Cliform version:      {}", highlight(env!("CARGO_PKG_VERSION"))),
    ]
}
