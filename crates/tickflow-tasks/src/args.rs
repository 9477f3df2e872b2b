//! Task argument strings.
//!
//! A task's `arguments` field is a command-line style string such as
//! `--root-dir="C:/data files" --include-filter=*.log;*.txt`. It is split
//! into tokens here and handed to a `clap` parser declared by each task.

use clap::Parser;
use tickflow_config::TaskSpec;
use tickflow_engine::TaskError;

/// Split an argument string into tokens.
///
/// Whitespace separates tokens. Single or double quotes group text that
/// contains whitespace and are removed. Inside double quotes and outside any
/// quotes a backslash escapes a quote or another backslash; any other
/// backslash is kept so Windows paths survive.
pub fn split_arguments(text: &str) -> Result<Vec<String>, TaskError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => match chars.peek() {
                Some(&next @ ('"' | '\'' | '\\')) if quote.is_none() || next != '\'' => {
                    current.push(next);
                    chars.next();
                    in_token = true;
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
            (Some('"'), '"') => quote = None,
            (Some(_), _) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(open) = quote {
        return Err(TaskError::InvalidArguments(format!("unterminated {open} quote")));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse a task's argument string with the parser `A`.
///
/// `A` must be declared with `#[command(no_binary_name = true)]`.
pub fn parse_arguments<A: Parser>(spec: &TaskSpec) -> Result<A, TaskError> {
    let tokens = split_arguments(&spec.arguments)?;
    A::try_parse_from(tokens).map_err(|e| {
        let rendered = e.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        TaskError::InvalidArguments(first.trim_start_matches("error: ").to_string())
    })
}

/// Split a `;`-separated filter list, dropping empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
