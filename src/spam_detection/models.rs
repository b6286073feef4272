//! Configuration, result types, and injected collaborator contracts.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Result of a single check in the pipeline.
///
/// Serializes to the wire form `{"name": ..., "spam": ..., "details": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// name of the check
    pub name: String,
    /// true if spam
    pub spam: bool,
    /// details of the check
    pub details: String,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.spam { "spam" } else { "ham" };
        write!(f, "{}: {}, {}", self.name, verdict, self.details)
    }
}

/// Counts reported by the corpus load operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    pub excluded_tokens: usize,
    pub spam_samples: usize,
    pub ham_samples: usize,
    pub stop_words: usize,
}

/// Updates spam/ham samples in durable storage on the fly.
pub trait SampleUpdater: Send + Sync {
    /// Append one message to the samples storage.
    fn append(&self, msg: &str) -> Result<()>;

    /// Return a reader over all previously appended samples.
    fn reader(&self) -> Result<Box<dyn Read + Send>>;
}

/// Response returned by an [`HttpClient`] call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Narrow HTTP contract used by the reputation check.
///
/// Implementations must enforce their own timeout; the engine does not
/// propagate cancellation into in-flight requests.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Detector configuration. All checks are opt-in: the default value of each
/// option disables the corresponding check.
#[derive(Clone)]
pub struct DetectorConfig {
    /// threshold for spam similarity, 0.0 - 1.0; 0 disables the check
    pub similarity_threshold: f64,
    /// minimum message length in code points; shorter messages short-circuit
    pub min_msg_len: usize,
    /// maximum number of emoji allowed in a message; negative disables
    pub max_allowed_emoji: i32,
    /// reputation service base URL; empty disables the check
    pub cas_api: String,
    /// if true, only users inside the observation window are checked
    pub first_message_only: bool,
    /// number of first messages to check for spam
    pub first_messages_count: usize,
    /// minimum spam probability (percent) for a classifier spam verdict; 0 disables the gate
    pub min_spam_probability: f64,
    /// if true, the LLM confirms spam verdicts instead of contesting ham verdicts
    pub openai_veto: bool,
    /// http client used by the reputation check
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.0,
            min_msg_len: 0,
            max_allowed_emoji: -1,
            cas_api: String::new(),
            first_message_only: false,
            first_messages_count: 0,
            min_spam_probability: 0.0,
            openai_veto: false,
            http_client: None,
        }
    }
}

impl fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("similarity_threshold", &self.similarity_threshold)
            .field("min_msg_len", &self.min_msg_len)
            .field("max_allowed_emoji", &self.max_allowed_emoji)
            .field("cas_api", &self.cas_api)
            .field("first_message_only", &self.first_message_only)
            .field("first_messages_count", &self.first_messages_count)
            .field("min_spam_probability", &self.min_spam_probability)
            .field("openai_veto", &self.openai_veto)
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_display() {
        let spam = CheckResult {
            name: "stopword".to_string(),
            spam: true,
            details: "buy now".to_string(),
        };
        assert_eq!(spam.to_string(), "stopword: spam, buy now");

        let ham = CheckResult {
            name: "cas".to_string(),
            spam: false,
            details: "not found".to_string(),
        };
        assert_eq!(ham.to_string(), "cas: ham, not found");
    }

    #[test]
    fn test_check_result_wire_form() {
        let cr = CheckResult {
            name: "emoji".to_string(),
            spam: true,
            details: "4/2".to_string(),
        };
        let json = serde_json::to_value(&cr).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "emoji", "spam": true, "details": "4/2"})
        );
    }

    #[test]
    fn test_config_default_disables_checks() {
        let config = DetectorConfig::default();
        assert_eq!(config.similarity_threshold, 0.0);
        assert_eq!(config.max_allowed_emoji, -1);
        assert!(config.cas_api.is_empty());
        assert!(!config.first_message_only);
        assert!(config.http_client.is_none());
    }
}
