use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<(parent_answer_text|lowercase_parent_answer_text|lowercase_text|capitalized_parent_answer_text|capitalized_text|sentence_case_parent_answer_text|sentence_case_text)>",
    )
    .expect("token pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    Verbatim,
    Capitalized,
    SentenceCase,
}

/// Replaces parent-answer tokens in `template` with `answer_text`.
///
/// Lowercase tokens lowercase only the substituted text; capitalized and
/// sentence-case tokens recase the whole rendered string.
pub fn substitute(template: &str, answer_text: &str) -> String {
    let mut mode = CaseMode::Verbatim;
    let rendered = TOKEN_RE.replace_all(template, |caps: &Captures<'_>| match &caps[1] {
        "lowercase_parent_answer_text" | "lowercase_text" => answer_text.to_lowercase(),
        "capitalized_parent_answer_text" | "capitalized_text" => {
            mode = CaseMode::Capitalized;
            answer_text.to_string()
        }
        "sentence_case_parent_answer_text" | "sentence_case_text" => {
            if mode == CaseMode::Verbatim {
                mode = CaseMode::SentenceCase;
            }
            answer_text.to_string()
        }
        _ => answer_text.to_string(),
    });
    match mode {
        CaseMode::Verbatim => rendered.into_owned(),
        CaseMode::Capitalized => capitalize_words(&rendered),
        CaseMode::SentenceCase => sentence_case(&rendered),
    }
}

pub fn has_tokens(text: &str) -> bool {
    TOKEN_RE.is_match(text)
}

/// Uppercases the first letter of each space-delimited word and lowercases the rest.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch == ' ' {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Uppercases the first non-space character and lowercases everything else.
pub fn sentence_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut seen_first = false;
    for ch in text.chars() {
        if !seen_first && !ch.is_whitespace() {
            out.extend(ch.to_uppercase());
            seen_first = true;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}
