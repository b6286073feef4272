//! LLM-backed spam verdicts.
//!
//! The detector consults the model only for messages inside the observation
//! window, either to contest a ham verdict (default) or to confirm a spam
//! verdict (veto mode). The model is reached through the narrow [`LlmClient`]
//! trait so tests and alternative providers plug in without touching the
//! engine.

use anyhow::Result;
use serde::Deserialize;

use crate::spam_detection::models::CheckResult;

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 1024;
const DEFAULT_MAX_REQUEST_TOKENS: u32 = 2048;
const DEFAULT_MAX_REQUEST_CHARS: usize = 16000;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a spam filter for a group chat. \
I will give you a message and you answer with a json object with two fields: \
{\"spam\": true or false, \"reason\": \"a short explanation\"}. \
Answer with the json object only, set spam to true only if you are confident.";

/// Chat-completion request handed to an [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_message: String,
    pub max_response_tokens: u32,
}

/// Narrow contract for the chat-completion backend. Returns the assistant's
/// text; implementations must enforce their own timeout.
pub trait LlmClient: Send + Sync {
    fn complete(&self, req: &LlmRequest) -> Result<String>;
}

/// LLM checker configuration. Empty strings select the built-in defaults.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// system prompt, empty selects the built-in default
    pub system_prompt: String,
    /// model name
    pub model: String,
    /// maximum tokens in the response
    pub max_response_tokens: u32,
    /// maximum tokens in the request
    pub max_request_tokens: u32,
    /// maximum characters in the request, the fallback budget since no
    /// tokenizer is carried
    pub max_request_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_response_tokens: DEFAULT_MAX_RESPONSE_TOKENS,
            max_request_tokens: DEFAULT_MAX_REQUEST_TOKENS,
            max_request_chars: DEFAULT_MAX_REQUEST_CHARS,
        }
    }
}

/// Verdict format the model is instructed to reply with.
#[derive(Debug, Deserialize)]
struct LlmVerdict {
    spam: bool,
    #[serde(default)]
    reason: String,
}

pub(crate) struct LlmChecker {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl LlmChecker {
    pub fn new(client: Box<dyn LlmClient>, mut config: LlmConfig) -> Self {
        if config.system_prompt.is_empty() {
            config.system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        }
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }
        if config.max_response_tokens == 0 {
            config.max_response_tokens = DEFAULT_MAX_RESPONSE_TOKENS;
        }
        if config.max_request_tokens == 0 {
            config.max_request_tokens = DEFAULT_MAX_REQUEST_TOKENS;
        }
        if config.max_request_chars == 0 {
            config.max_request_chars = DEFAULT_MAX_REQUEST_CHARS;
        }
        Self { client, config }
    }

    /// Ask the model whether a message is spam.
    ///
    /// Returns `Some(verdict)` with the model's answer, or `None` when the
    /// call or the answer parsing failed; in both cases the CheckResult to
    /// append is included. A `None` verdict must not alter the verdict
    /// reached by the preceding checks.
    pub fn check(&self, msg: &str) -> (Option<bool>, CheckResult) {
        let request = LlmRequest {
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            user_message: self.truncate(msg),
            max_response_tokens: self.config.max_response_tokens,
        };

        let reply = match self.client.complete(&request) {
            Ok(reply) => reply,
            Err(e) => {
                return (
                    None,
                    CheckResult {
                        name: "openai".to_string(),
                        spam: false,
                        details: format!("failed to check with openai: {:#}", e),
                    },
                );
            }
        };

        match serde_json::from_str::<LlmVerdict>(reply.trim()) {
            Ok(verdict) => (
                Some(verdict.spam),
                CheckResult {
                    name: "openai".to_string(),
                    spam: verdict.spam,
                    details: verdict.reason,
                },
            ),
            Err(e) => (
                None,
                CheckResult {
                    name: "openai".to_string(),
                    spam: false,
                    details: format!("failed to parse openai response: {}", e),
                },
            ),
        }
    }

    /// Bound the outgoing message by the character budget, approximating the
    /// token budget at four characters per token.
    fn truncate(&self, msg: &str) -> String {
        let budget = self
            .config
            .max_request_chars
            .min(self.config.max_request_tokens as usize * 4);
        if msg.chars().count() <= budget {
            return msg.to_string();
        }
        msg.chars().take(budget).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    struct StubLlm {
        reply: Result<&'static str, &'static str>,
        requests: Arc<Mutex<Vec<LlmRequest>>>,
    }

    impl StubLlm {
        fn new(reply: Result<&'static str, &'static str>) -> Self {
            Self {
                reply,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl LlmClient for StubLlm {
        fn complete(&self, req: &LlmRequest) -> Result<String> {
            self.requests.lock().unwrap().push(req.clone());
            match self.reply {
                Ok(reply) => Ok(reply.to_string()),
                Err(msg) => Err(anyhow!(msg)),
            }
        }
    }

    fn checker(reply: Result<&'static str, &'static str>) -> LlmChecker {
        LlmChecker::new(Box::new(StubLlm::new(reply)), LlmConfig::default())
    }

    #[test]
    fn test_spam_verdict() {
        let checker = checker(Ok(r#"{"spam": true, "reason": "link farm"}"#));
        let (verdict, result) = checker.check("click here");
        assert_eq!(verdict, Some(true));
        assert!(result.spam);
        assert_eq!(result.name, "openai");
        assert_eq!(result.details, "link farm");
    }

    #[test]
    fn test_ham_verdict() {
        let checker = checker(Ok(r#"{"spam": false, "reason": "looks fine"}"#));
        let (verdict, result) = checker.check("hello all");
        assert_eq!(verdict, Some(false));
        assert!(!result.spam);
        assert_eq!(result.details, "looks fine");
    }

    #[test]
    fn test_transport_error_gives_no_verdict() {
        let checker = checker(Err("rate limited"));
        let (verdict, result) = checker.check("hello");
        assert_eq!(verdict, None);
        assert!(!result.spam);
        assert!(result.details.contains("rate limited"));
    }

    #[test]
    fn test_unparsable_reply_gives_no_verdict() {
        let checker = checker(Ok("I think this might be spam."));
        let (verdict, result) = checker.check("hello");
        assert_eq!(verdict, None);
        assert!(!result.spam);
        assert!(result.details.contains("failed to parse"));
    }

    #[test]
    fn test_default_prompt_and_model_filled_in() {
        let stub = StubLlm::new(Ok(r#"{"spam": false}"#));
        let checker = LlmChecker::new(
            Box::new(stub),
            LlmConfig {
                system_prompt: String::new(),
                model: String::new(),
                ..Default::default()
            },
        );
        assert_eq!(checker.config.model, DEFAULT_MODEL);
        assert!(!checker.config.system_prompt.is_empty());
    }

    #[test]
    fn test_long_message_truncated() {
        let stub = StubLlm::new(Ok(r#"{"spam": false}"#));
        let requests = Arc::clone(&stub.requests);
        let checker = LlmChecker::new(
            Box::new(stub),
            LlmConfig {
                max_request_chars: 10,
                ..Default::default()
            },
        );
        checker.check("0123456789 overflow text");
        assert_eq!(requests.lock().unwrap()[0].user_message, "0123456789");
    }

    #[test]
    fn test_short_message_passes_through() {
        let stub = StubLlm::new(Ok(r#"{"spam": false}"#));
        let requests = Arc::clone(&stub.requests);
        let checker = LlmChecker::new(Box::new(stub), LlmConfig::default());
        checker.check("short message");
        assert_eq!(requests.lock().unwrap()[0].user_message, "short message");
    }
}
