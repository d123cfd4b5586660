//! Shared line-scanning helpers for the pattern-matching extractors.
//!
//! These extractors are deliberately regex-based: coverage degrades
//! predictably on exotic syntax, and they must never fail outright.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex"));

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("static regex"));

/// Remove `//` line comments and `/* */` block comments, blanking them with
/// spaces so byte offsets and line numbers are preserved. String literal
/// contents are kept.
pub fn strip_comments(source: &str) -> String {
    blank_regions(source, false)
}

/// Like [`strip_comments`] but string literal contents are blanked too.
/// Used before call collection so `"call_me()"` inside a string does not
/// register.
pub fn strip_comments_and_strings(source: &str) -> String {
    blank_regions(source, true)
}

fn blank_regions(source: &str, blank_strings: bool) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(char),
    }
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '"' | '\'' | '`' => {
                    out.push(c);
                    state = State::Str(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::Str(quote) => {
                if c == '\\' {
                    if blank_strings {
                        out.push_str("  ");
                    } else {
                        out.push(c);
                        if let Some(&next) = chars.peek() {
                            out.push(next);
                        }
                    }
                    chars.next();
                } else if c == quote {
                    out.push(c);
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else if blank_strings {
                    out.push(' ');
                } else {
                    out.push(c);
                }
            }
        }
    }
    out
}

/// Inclusive line index where the brace block opening at `start` closes.
/// Returns `start` when no brace opens within a few lines (one-line decl or
/// prototype).
pub fn block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i32 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i;
        }
        if !opened && i >= start + 2 {
            return start;
        }
    }
    if opened { lines.len().saturating_sub(1) } else { start }
}

/// Call-like identifiers in `text`, first-occurrence order, deduplicated,
/// with keywords, deny-set entries, and the entity's own name removed.
pub fn collect_calls(text: &str, deny: &[&str], keywords: &[&str], own_name: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut calls = Vec::new();
    for cap in CALL_RE.captures_iter(text) {
        let name = &cap[1];
        if name == own_name || deny.contains(&name) || keywords.contains(&name) {
            continue;
        }
        if seen.insert(name.to_string()) {
            calls.push(name.to_string());
        }
    }
    calls
}

/// Split a parameter list on top-level commas, respecting nesting in
/// `()`, `[]`, `{}`, and `<>`.
pub fn split_params(params: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    for c in params.chars() {
        match c {
            '(' | '[' | '{' | '<' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' | '>' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out.retain(|p| !p.is_empty());
    out
}

/// Identifiers in a type expression, deduplicated in order, deny-filtered.
pub fn type_identifiers(text: &str, deny: &[&str]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for m in IDENT_RE.find_iter(text) {
        let name = m.as_str();
        if deny.contains(&name) {
            continue;
        }
        if seen.insert(name.to_string()) {
            out.push(name.to_string());
        }
    }
    out
}

/// Join an inclusive line range back into one text block.
pub fn join_lines(lines: &[&str], start: usize, end: usize) -> String {
    lines[start..=end.min(lines.len().saturating_sub(1))].join("\n")
}
