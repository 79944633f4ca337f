//! Text normalization and tokenization
//!
//! Strips URLs, markup and formatting noise while keeping the punctuation,
//! emoji and casing that carry sentiment.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r"(?i)\b(?:https?://|www\.)\S+").unwrap();
    static ref TAG_REGEX: Regex = Regex::new(r"</?[a-zA-Z!][^>]*>").unwrap();
    static ref MENTION_REGEX: Regex = Regex::new(r"(?:^|\s)(?:@|u/)\w+").unwrap();
    static ref NOISE_REGEX: Regex = Regex::new(r"[#*_~|^`\\\[\]{}<>=+]+").unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&lt;", " "),
    ("&gt;", " "),
];

/// Punctuation trimmed from token edges
const EDGE_PUNCTUATION: &[char] = &['!', '?', '.', ',', ';', ':', '\'', '"', '-', '(', ')'];

/// Punctuation that closes a clause for negation scoping
const CLAUSE_PUNCTUATION: &[char] = &['!', '?', '.', ',', ';', ':'];

/// Clean raw collector text for scoring. Never fails; blank input yields an empty string.
pub fn normalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let text = URL_REGEX.replace_all(raw, " ");
    let text = TAG_REGEX.replace_all(&text, " ");

    let mut text = text.into_owned();
    for (entity, replacement) in HTML_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }

    let text: String = text
        .chars()
        .filter_map(|c| match c {
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{201C}' | '\u{201D}' => Some('"'),
            '\u{200B}'..='\u{200D}' | '\u{FEFF}' | '\u{FE0F}' => None,
            c if c.is_control() && !c.is_whitespace() => None,
            c => Some(c),
        })
        .collect();

    let text = MENTION_REGEX.replace_all(&text, " ");
    let text = NOISE_REGEX.replace_all(&text, " ");
    let text = WHITESPACE_REGEX.replace_all(&text, " ");

    text.trim().to_string()
}

/// One whitespace-delimited token with its edge punctuation removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lowercased form used for lexicon lookups
    pub word: String,
    /// Original casing
    pub raw: String,
    /// Followed by clause-closing punctuation
    pub ends_clause: bool,
}

impl Token {
    /// Carries at least one letter or digit
    pub fn is_word(&self) -> bool {
        self.word.chars().any(|c| c.is_alphanumeric())
    }

    /// Written in capitals (two or more letters, none lowercase)
    pub fn is_shouting(&self) -> bool {
        let letters: Vec<char> = self.raw.chars().filter(|c| c.is_alphabetic()).collect();
        letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
    }
}

/// Split normalized text into tokens, tracking clause boundaries
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for piece in text.split_whitespace() {
        let core_end = piece
            .trim_end_matches(|c| EDGE_PUNCTUATION.contains(&c))
            .len();
        let ends_clause = piece[core_end..].contains(|c| CLAUSE_PUNCTUATION.contains(&c));
        let core = piece.trim_matches(|c| EDGE_PUNCTUATION.contains(&c));

        if core.is_empty() {
            if ends_clause {
                if let Some(last) = tokens.last_mut() {
                    last.ends_clause = true;
                }
            }
            continue;
        }

        tokens.push(Token {
            word: core.to_lowercase(),
            raw: core.to_string(),
            ends_clause,
        });
    }

    tokens
}

/// Count of tokens that carry letters or digits
pub fn word_count(tokens: &[Token]) -> usize {
    tokens.iter().filter(|t| t.is_word()).count()
}
