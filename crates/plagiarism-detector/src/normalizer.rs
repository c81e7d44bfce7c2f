//! Source normalization: raw text to a canonical comparable form
//!
//! Normalization is pure and deterministic. It removes comments, module
//! imports and layout, and in aggressive mode replaces literals and
//! identifiers with placeholder tokens so renamed copies still line up.
//! Token order is never changed.

use lazy_static::lazy_static;
use plagiarism_domain::{Language, NormalizationConfig, SourceFile};
use regex::{Captures, Regex};
use tracing::debug;

pub const STRING_TOKEN: &str = "TOKEN_STRING";
pub const NUMBER_TOKEN: &str = "TOKEN_NUMBER";
pub const TYPE_TOKEN: &str = "TokenClass";
pub const NAME_TOKEN: &str = "TokenVar";

lazy_static! {
    static ref QUOTED_STRING: Regex =
        Regex::new(r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\.)*`"#).unwrap();
    static ref DOUBLE_QUOTED_STRING: Regex =
        Regex::new(r#""(?:[^"\\\n]|\\.)*"|`(?:[^`\\]|\\.)*`"#).unwrap();
    static ref CHAR_LITERAL: Regex = Regex::new(r#"'(?:[^'\\\n]|\\[^'\n]{1,8})'"#).unwrap();
    static ref NUMBER: Regex =
        Regex::new(r"\b(?:0[xX][0-9a-fA-F_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)\b").unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap();
}

/// Normalize one document
pub fn normalize(text: &str, language: Language, aggressive: bool) -> String {
    let stripped = strip_comments(text, language);
    let stripped = strip_imports(&stripped, language);
    let collapsed = collapse_whitespace(&stripped);

    if aggressive { collapse_whitespace(&replace_tokens(&collapsed, language)) } else { collapsed }
}

/// Fill in `normalized_text` and drop files too short to compare
pub fn prepare_files(
    files: Vec<SourceFile>,
    language: Language,
    config: &NormalizationConfig,
) -> Vec<SourceFile> {
    let total = files.len();
    let prepared: Vec<SourceFile> = files
        .into_iter()
        .map(|file| {
            let normalized = normalize(&file.raw_text, language, config.aggressive);
            file.normalized_text(normalized)
        })
        .filter(|file| file.normalized_text.chars().count() >= config.min_normalized_length)
        .collect();

    if prepared.len() < total {
        debug!(
            dropped = total - prepared.len(),
            min_length = config.min_normalized_length,
            "Dropped files below minimum normalized length"
        );
    }
    prepared
}

fn strip_comments(text: &str, language: Language) -> String {
    let line_marker = language.line_comment();
    let blocks = language.block_comments();
    let delimiters = language.string_delimiters();

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if let Some((open, close)) = blocks.iter().find(|(open, _)| rest.starts_with(open)) {
            let body = &rest[open.len()..];
            rest = match body.find(close) {
                Some(end) => &body[end + close.len()..],
                None => "",
            };
            out.push(' ');
            continue;
        }

        if rest.starts_with(line_marker) {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
            continue;
        }

        if delimiters.contains(&ch) {
            let len = string_literal_len(rest, ch);
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }

        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}

/// Byte length of the literal opening `text`, closing quote included.
/// Unterminated literals end at the line break, except backtick strings.
fn string_literal_len(text: &str, quote: char) -> usize {
    let multiline = quote == '`';
    let mut escaped = false;

    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !multiline => escaped = true,
            '\n' if !multiline => return i,
            c if c == quote => return i + c.len_utf8(),
            _ => {}
        }
    }

    text.len()
}

fn strip_imports(text: &str, language: Language) -> String {
    let prefixes = language.import_prefixes();
    let lookalikes = language.import_lookalikes();
    let mut kept = Vec::new();
    // brackets of a multi-line import group being skipped, and its open depth
    let mut group: Option<(char, char, isize)> = None;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some((open, close, depth)) = group {
            let depth = depth + bracket_balance(trimmed, open, close);
            group = (depth > 0).then_some((open, close, depth));
            continue;
        }

        let is_import = prefixes.iter().any(|prefix| trimmed.starts_with(prefix))
            && !lookalikes.iter().any(|form| trimmed.starts_with(form));
        if is_import {
            group = [('(', ')'), ('{', '}')].into_iter().find_map(|(open, close)| {
                let depth = bracket_balance(trimmed, open, close);
                (depth > 0).then_some((open, close, depth))
            });
            continue;
        }

        kept.push(line);
    }

    kept.join("\n")
}

/// Opening minus closing brackets on one line
fn bracket_balance(line: &str, open: char, close: char) -> isize {
    line.chars().fold(0, |depth, c| match c {
        c if c == open => depth + 1,
        c if c == close => depth - 1,
        _ => depth,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn replace_tokens(text: &str, language: Language) -> String {
    let text = if language.single_quoted_strings() {
        QUOTED_STRING.replace_all(text, STRING_TOKEN)
    } else {
        let text = DOUBLE_QUOTED_STRING.replace_all(text, STRING_TOKEN);
        CHAR_LITERAL.replace_all(&text, STRING_TOKEN).into_owned().into()
    };
    let text = NUMBER.replace_all(&text, NUMBER_TOKEN);

    IDENTIFIER
        .replace_all(&text, |caps: &Captures| {
            let word = &caps[0];
            if word == STRING_TOKEN || word == NUMBER_TOKEN || language.is_keyword(word) {
                word.to_string()
            } else if word.starts_with(|c: char| c.is_ascii_uppercase()) {
                TYPE_TOKEN.to_string()
            } else {
                NAME_TOKEN.to_string()
            }
        })
        .into_owned()
}
