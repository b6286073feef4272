//! Message tokenization and sample-stream parsing.
//!
//! Tokenization turns a message into a token-frequency map used by the
//! similarity check and the classifier. The sample-stream reader understands
//! the line-oriented grammar shared by all corpus files: one token or phrase
//! per line, or a quoted comma-separated list.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use crate::utils::emoji::clean_emoji;

/// Punctuation trimmed from both ends of each token.
const TOKEN_TRIM_CHARS: &str = ".,!?-:;()#";

/// Minimum token length in code points; shorter pieces are dropped.
const MIN_TOKEN_LEN: usize = 3;

/// Tokenize a message into a map of token -> frequency.
///
/// Splits on whitespace; pieces equal (case-insensitively) to an excluded
/// token are dropped; the rest are stripped of emoji, trimmed of punctuation,
/// lowercased, and dropped when shorter than three code points.
///
/// # Examples
/// ```
/// # use spamscan::spam_detection::tokenize::tokenize;
/// let freq = tokenize("Hello, hello world!", &[]);
/// assert_eq!(freq.get("hello"), Some(&2));
/// assert_eq!(freq.get("world"), Some(&1));
/// ```
pub fn tokenize(text: &str, excluded_tokens: &[String]) -> HashMap<String, usize> {
    let mut frequency = HashMap::new();

    for piece in text.split_whitespace() {
        let lowered = piece.to_lowercase();
        if excluded_tokens.iter().any(|w| *w == lowered) {
            continue;
        }
        let token = clean_emoji(piece);
        let token = token
            .trim_matches(|c: char| TOKEN_TRIM_CHARS.contains(c))
            .to_lowercase();
        if token.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        *frequency.entry(token).or_insert(0) += 1;
    }

    frequency
}

/// Read tokens from a line-oriented sample stream.
///
/// Two line forms are accepted: a bare line, trimmed of whitespace, yielding
/// a single token; and a line starting with `"` containing at least one
/// comma, split on commas with each piece trimmed of `" \n\r\t`. Blank lines
/// and empty pieces are skipped. A read error is logged and terminates this
/// reader without propagating.
pub(crate) fn read_tokens(reader: impl Read) -> Vec<String> {
    let mut tokens = Vec::new();

    for line in BufReader::new(reader).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to read tokens: {}", e);
                break;
            }
        };

        if line.contains(',') && line.starts_with('"') {
            for piece in line.split(',') {
                let clean = piece.trim_matches(|c: char| matches!(c, ' ' | '"' | '\n' | '\r' | '\t'));
                if !clean.is_empty() {
                    tokens.push(clean.to_string());
                }
            }
            continue;
        }

        let clean = line.trim_matches(|c: char| matches!(c, ' ' | '\n' | '\r' | '\t'));
        if !clean.is_empty() {
            tokens.push(clean.to_string());
        }
    }

    tokens
}
