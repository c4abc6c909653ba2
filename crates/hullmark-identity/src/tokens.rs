//! Tokenizer and sanitizer shared by every identity rule.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

static ROMAN_OR_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[IVX]+|[0-9]{1,2})$").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,4}$").unwrap());

const MARK_PREFIX: &str = "MK";

/// Split on runs of non-alphanumeric characters and uppercase what is left.
pub fn tokenize(text: &str) -> Vec<String> {
    NON_ALNUM
        .split(text)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Collapse a string into one underscore-joined uppercase token.
pub fn sanitize_token(text: &str) -> String {
    NON_ALNUM
        .replace_all(text, "_")
        .trim_matches('_')
        .to_uppercase()
}

/// Tokens of a hull designation, with mark designators fused so that
/// `Mk II` and `MkII` produce the same `MKII` token.
pub fn designation_tokens(text: &str) -> Vec<String> {
    fuse_mark_designators(tokenize(text))
}

pub fn fuse_mark_designators(tokens: Vec<String>) -> Vec<String> {
    let mut fused = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if token == MARK_PREFIX
            && let Some(next) = iter.next_if(|n| ROMAN_OR_NUMBER.is_match(n))
        {
            fused.push(format!("{token}{next}"));
            continue;
        }
        fused.push(token);
    }
    fused
}

/// A 3 or 4 digit ASCII token, typically an event year trailing an edition keyword.
pub fn is_year_token(token: &str) -> bool {
    YEAR.is_match(token)
}

/// Human-readable form of an uppercase token sequence. Designators and
/// tokens carrying digits keep their case; `MKII` renders as `Mk II`.
pub fn title_case(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|w| !w.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let upper = word.to_uppercase();
    if let Some(rest) = upper.strip_prefix(MARK_PREFIX)
        && !rest.is_empty()
        && ROMAN_OR_NUMBER.is_match(rest)
    {
        return format!("Mk {rest}");
    }
    if ROMAN_OR_NUMBER.is_match(&upper) || upper.chars().any(|c| c.is_ascii_digit()) {
        return upper;
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
