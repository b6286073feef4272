//! Cheap local checks: stop-word phrases and emoji count.

use crate::spam_detection::models::CheckResult;
use crate::utils::emoji::{clean_emoji, count_emoji};

/// Substring search for any loaded stop-word phrase. Phrases are stored
/// lowercased; the message is lowercased and stripped of emoji first.
pub(crate) fn stop_word_check(msg: &str, stop_words: &[String]) -> CheckResult {
    let clean_msg = clean_emoji(&msg.to_lowercase());
    for word in stop_words {
        if clean_msg.contains(word.as_str()) {
            return CheckResult {
                name: "stopword".to_string(),
                spam: true,
                details: word.clone(),
            };
        }
    }
    CheckResult {
        name: "stopword".to_string(),
        spam: false,
        details: "not found".to_string(),
    }
}

/// Spam when the message carries more than `max_allowed` emoji.
pub(crate) fn emoji_check(msg: &str, max_allowed: i32) -> CheckResult {
    let count = count_emoji(msg);
    CheckResult {
        name: "emoji".to_string(),
        spam: count as i64 > max_allowed as i64,
        details: format!("{}/{}", count, max_allowed),
    }
}
