// src/core/docstring.rs

//! Docstring reading: per-parameter descriptions and command summaries.
//!
//! Two dialects are understood. The colon dialect (`:param name: text`) and
//! the indented block dialect (`Args:` followed by `name (type): text`). When
//! both describe the same parameter, the block dialect wins.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    // `name: text` or `name (type): text` inside an `Args:` block.
    static ref BLOCK_PARAM_RE: Regex = Regex::new(r"^[^ :]+ *:|^[^ ]+ +\([^)]+\):").unwrap();
    // `:param name (type): text`, where the name sits before the parenthesis.
    static ref COLON_TYPED_RE: Regex = Regex::new(r":param +[^ ]+ +[(]").unwrap();
    // Where the summary of a docstring ends.
    static ref SUMMARY_END_RE: Regex =
        Regex::new(r"(?m)^ *Parameter|^ *Return|^ *Example|^ *Args:|:param|\n\s*\n").unwrap();
}

/// Section headers that close an `Args:` block.
const BLOCK_TERMINATORS: &[&str] = &["Returns:", "Raises:", "Yields:", "Examples:", "Example:"];

/// Accumulates the lines of the parameter currently being described.
#[derive(Debug, Default)]
struct Pending {
    current: Option<(String, Vec<String>)>,
    results: HashMap<String, String>,
}

impl Pending {
    fn start(&mut self, name: &str, first_line: &str) {
        self.flush();
        self.current = Some((name.to_string(), vec![first_line.trim().to_string()]));
    }

    fn push(&mut self, line: &str) {
        if let Some((_, lines)) = &mut self.current
            && !line.is_empty()
        {
            lines.push(line.to_string());
        }
    }

    fn flush(&mut self) {
        if let Some((name, lines)) = self.current.take() {
            self.results.insert(name, lines.join("\n"));
        }
    }

    fn finish(mut self) -> HashMap<String, String> {
        self.flush();
        self.results
    }
}

/// Reads `:param name: text` descriptions.
pub fn parse_colon_params(doc: &str) -> HashMap<String, String> {
    let mut pending = Pending::default();

    for line in doc.lines().map(str::trim) {
        if line.starts_with(':') {
            pending.flush();
            if !line.starts_with(":param") {
                continue;
            }
            let mut parts = line.splitn(3, ':');
            let (Some(_), Some(head), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            let words: Vec<&str> = head.split_whitespace().collect();
            let name = if COLON_TYPED_RE.is_match(line) {
                words.iter().rev().nth(1)
            } else {
                words.last()
            };
            if let Some(name) = name {
                pending.start(name, text);
            }
        } else {
            pending.push(line);
        }
    }

    pending.finish()
}

/// Reads the `Args:` block: `name (type): text` entries with continuation lines.
pub fn parse_block_params(doc: &str) -> HashMap<String, String> {
    let mut pending = Pending::default();
    let mut in_args = false;

    for line in doc.lines().map(str::trim) {
        if BLOCK_TERMINATORS.contains(&line) {
            break;
        }
        if !in_args {
            in_args = line == "Args:" || line == "Arguments:";
            continue;
        }
        if BLOCK_PARAM_RE.is_match(line) {
            let name = line
                .split(':')
                .next()
                .and_then(|head| head.split_whitespace().next())
                .map(|name| name.trim_start_matches('*'))
                .unwrap_or_default();
            let text = BLOCK_PARAM_RE.replace(line, "");
            pending.start(name, &text);
        } else {
            pending.push(line);
        }
    }

    pending.finish()
}

/// Parameter descriptions from both dialects, the block dialect winning.
pub fn parse_doc_params(doc: &str) -> HashMap<String, String> {
    let mut params = parse_colon_params(doc);
    params.extend(parse_block_params(doc));
    params
}

/// The command description: the docstring summary with its first letter upper-cased.
pub fn summary(doc: &str) -> String {
    let head = SUMMARY_END_RE.split(doc.trim_start()).next().unwrap_or_default().trim();
    let mut chars = head.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
