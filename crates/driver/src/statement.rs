// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Statement framing for multi-statement query text.
//!
//! Splits on top-level semicolons only. Quoted identifiers, string literals,
//! dollar-quoted bodies and comments are skipped over; nothing is parsed.

/// Split query text into trimmed, non-empty sub-statements
///
/// Unterminated quotes or comments swallow the rest of the input into the
/// last statement, leaving the backend to report the error.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match ch {
            '-' if next == Some('-') => {
                let end = find_from(&chars, i, |c, _| c == '\n').unwrap_or(chars.len());
                current.extend(&chars[i..end]);
                i = end;
            }
            '/' if next == Some('*') => {
                let end = find_seq(&chars, i + 2, &['*', '/'])
                    .map(|pos| pos + 2)
                    .unwrap_or(chars.len());
                current.extend(&chars[i..end]);
                i = end;
            }
            '\'' | '"' | '`' => {
                let end = closing_quote(&chars, i, ch);
                current.extend(&chars[i..end]);
                i = end;
            }
            '$' => match dollar_tag(&chars, i) {
                Some(tag) => {
                    let body_start = i + tag.len();
                    let end = find_seq(&chars, body_start, &tag)
                        .map(|pos| pos + tag.len())
                        .unwrap_or(chars.len());
                    current.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    current.push(ch);
                    i += 1;
                }
            },
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
                i += 1;
            }
            _ => {
                current.push(ch);
                i += 1;
            }
        }
    }

    push_statement(&mut statements, &current);
    statements
}

/// Leading keyword of a statement, upper-cased ("SELECT", "INSERT", ...)
///
/// Comments and whitespace before the keyword are skipped. Returns an empty
/// string for text without a keyword.
pub fn statement_command(sql: &str) -> String {
    let mut rest = sql.trim_start();
    loop {
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = stripped
                .split_once('\n')
                .map(|(_, tail)| tail)
                .unwrap_or("")
                .trim_start();
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            rest = stripped
                .split_once("*/")
                .map(|(_, tail)| tail)
                .unwrap_or("")
                .trim_start();
        } else {
            break;
        }
    }

    rest.chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Quote a value as a SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn push_statement(statements: &mut Vec<String>, current: &str) {
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
}

/// Index just past the quote closing the one opened at `start`.
/// A doubled quote character is an escape.
fn closing_quote(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Dollar-quote opener at `start` (`$$` or `$tag$`), if any
fn dollar_tag(chars: &[char], start: usize) -> Option<Vec<char>> {
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '$' {
            return Some(chars[start..=i].to_vec());
        }
        let valid = if i == start + 1 {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
        i += 1;
    }
    None
}

fn find_seq(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || from > chars.len() {
        return None;
    }
    chars[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

fn find_from(chars: &[char], from: usize, pred: impl Fn(char, usize) -> bool) -> Option<usize> {
    (from..chars.len()).find(|&i| pred(chars[i], i))
}
