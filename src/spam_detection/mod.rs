//! Spam Detection Engine
//!
//! This module provides spam classification for short user messages by
//! running a layered set of checks over a corpus of spam/ham samples and
//! keeping per-user approval state. The [`Detector`] facade is safe to share
//! across threads: checks run under a shared lock, corpus mutations under an
//! exclusive one.

mod approved;
mod cas;
mod classifier;
mod heuristics;
pub mod llm;
mod models;
mod sample_store;
mod similarity;
pub mod tokenize;

use std::io::{Cursor, Read};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};

use crate::spam_detection::approved::ApprovedUsers;
use crate::spam_detection::cas::cas_check;
use crate::spam_detection::classifier::{Classifier, Document};
use crate::spam_detection::heuristics::{emoji_check, stop_word_check};
use crate::spam_detection::llm::{LlmChecker, LlmClient, LlmConfig};
use crate::spam_detection::similarity::similarity_check;
use crate::spam_detection::tokenize::{read_tokens, tokenize};

pub use classifier::SpamClass;
pub use models::{
    CheckResult, DetectorConfig, HttpClient, HttpResponse, LoadResult, SampleUpdater,
};
pub use sample_store::FileSampleUpdater;

/// Corpus state guarded by the detector's reader/writer lock.
#[derive(Default)]
struct CorpusState {
    classifier: Classifier,
    tokenized_spam: Vec<std::collections::HashMap<String, usize>>,
    excluded_tokens: Vec<String>,
    stop_words: Vec<String>,
}

/// Thread-safe spam detector.
///
/// Runs a fixed pipeline of checks over each message, collects one
/// [`CheckResult`] per executed check, and tracks per-user observation
/// counters so users with enough ham history skip the pipeline entirely.
pub struct Detector {
    config: DetectorConfig,
    state: RwLock<CorpusState>,
    approved_users: ApprovedUsers,
    llm_checker: Option<LlmChecker>,
    spam_updater: Option<Box<dyn SampleUpdater>>,
    ham_updater: Option<Box<dyn SampleUpdater>>,
}

impl Detector {
    /// Make a new detector with the given config.
    ///
    /// Setting `first_messages_count > 0` forces `first_message_only`, so a
    /// configured window is never silently ignored.
    pub fn new(mut config: DetectorConfig) -> Self {
        if config.first_messages_count > 0 {
            config.first_message_only = true;
        }
        Self {
            config,
            state: RwLock::new(CorpusState::default()),
            approved_users: ApprovedUsers::new(),
            llm_checker: None,
            spam_updater: None,
            ham_updater: None,
        }
    }

    /// Attach an LLM checker consulted per the gating rules of [`check`].
    ///
    /// [`check`]: Detector::check
    pub fn with_llm_checker(mut self, client: Box<dyn LlmClient>, config: LlmConfig) -> Self {
        self.llm_checker = Some(LlmChecker::new(client, config));
        self
    }

    /// Attach durable storage for dynamically learned spam samples.
    pub fn with_spam_updater(mut self, updater: Box<dyn SampleUpdater>) -> Self {
        self.spam_updater = Some(updater);
        self
    }

    /// Attach durable storage for dynamically learned ham samples.
    pub fn with_ham_updater(mut self, updater: Box<dyn SampleUpdater>) -> Self {
        self.ham_updater = Some(updater);
        self
    }

    /// Check if a message is spam. Returns the verdict and one result per
    /// executed check, in pipeline order.
    pub fn check(&self, msg: &str, user_id: &str) -> (bool, Vec<CheckResult>) {
        let state = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        // approved users don't need to be checked
        if self.config.first_message_only
            && self.approved_users.count(user_id) > self.config.first_messages_count
        {
            return (
                false,
                vec![CheckResult {
                    name: "pre-approved".to_string(),
                    spam: false,
                    details: "user already approved".to_string(),
                }],
            );
        }

        let mut results = Vec::new();

        if !state.stop_words.is_empty() {
            results.push(stop_word_check(msg, &state.stop_words));
        }

        if self.config.max_allowed_emoji >= 0 {
            results.push(emoji_check(msg, self.config.max_allowed_emoji));
        }

        // the length gate runs after the simple checks: stop words and emoji
        // can be triggered by short messages as well
        if msg.chars().count() < self.config.min_msg_len {
            results.push(CheckResult {
                name: "message length".to_string(),
                spam: false,
                details: "too short".to_string(),
            });
            let spam = results.iter().any(|r| r.spam);
            return (spam, results);
        }

        if self.config.similarity_threshold > 0.0 && !state.tokenized_spam.is_empty() {
            let message_tokens = tokenize(msg, &state.excluded_tokens);
            results.push(similarity_check(
                &message_tokens,
                &state.tokenized_spam,
                self.config.similarity_threshold,
            ));
        }

        if state.classifier.total_docs() > 0 {
            results.push(self.classifier_check(&state, msg));
        }

        if !self.config.cas_api.is_empty() {
            results.push(cas_check(
                self.config.http_client.as_deref(),
                &self.config.cas_api,
                user_id,
            ));
        }

        let mut spam_detected = results.iter().any(|r| r.spam);

        // the LLM runs in two cases: a ham verdict with veto off, to catch
        // false negatives, and a spam verdict with veto on, to catch false
        // positives. the observation window must be enabled, since the call
        // is too slow and expensive to run on every message.
        if let Some(llm_checker) = &self.llm_checker {
            if (self.config.first_message_only || self.config.first_messages_count > 0)
                && (!spam_detected && !self.config.openai_veto
                    || spam_detected && self.config.openai_veto)
            {
                let (verdict, result) = llm_checker.check(msg);
                results.push(result);
                if let Some(verdict) = verdict {
                    spam_detected = verdict;
                }
            }
        }

        if spam_detected {
            return (true, results);
        }

        if self.config.first_message_only || self.config.first_messages_count > 0 {
            self.approved_users.increment(user_id);
        }
        (false, results)
    }

    fn classifier_check(&self, state: &CorpusState, msg: &str) -> CheckResult {
        let frequency = tokenize(msg, &state.excluded_tokens);
        let tokens: Vec<String> = frequency.into_keys().collect();
        let (class, probability, certain) = state.classifier.classify(&tokens);
        let spam = class == SpamClass::Spam
            && certain
            && (self.config.min_spam_probability == 0.0
                || probability >= self.config.min_spam_probability);
        CheckResult {
            name: "classifier".to_string(),
            spam,
            details: format!("probability of {}: {:.2}%", class, probability),
        }
    }

    /// Load the sample corpus and retrain the classifier from scratch.
    ///
    /// Excluded tokens are read first so they are dropped from the spam and
    /// ham tokenization that follows. Reader failures are logged and end that
    /// reader; the returned counts reflect what was actually read.
    pub fn load_samples(
        &self,
        excluded: impl Read,
        spam_readers: Vec<Box<dyn Read>>,
        ham_readers: Vec<Box<dyn Read>>,
    ) -> Result<LoadResult> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        state.tokenized_spam.clear();
        state.excluded_tokens.clear();
        state.classifier.reset();

        for token in read_tokens(excluded) {
            state.excluded_tokens.push(token.to_lowercase());
        }

        let mut result = LoadResult {
            excluded_tokens: state.excluded_tokens.len(),
            ..LoadResult::default()
        };

        let mut docs = Vec::new();
        for reader in spam_readers {
            for sample in read_tokens(reader) {
                let frequency = tokenize(&sample, &state.excluded_tokens);
                docs.push(Document::from_freq(SpamClass::Spam, &frequency));
                state.tokenized_spam.push(frequency);
                result.spam_samples += 1;
            }
        }
        for reader in ham_readers {
            for sample in read_tokens(reader) {
                let frequency = tokenize(&sample, &state.excluded_tokens);
                docs.push(Document::from_freq(SpamClass::Ham, &frequency));
                result.ham_samples += 1;
            }
        }

        state.classifier.learn(&docs);
        log::info!(
            "loaded {} excluded tokens, {} spam samples, {} ham samples",
            result.excluded_tokens,
            result.spam_samples,
            result.ham_samples
        );
        Ok(result)
    }

    /// Replace the stop-word list from the given readers.
    pub fn load_stop_words(&self, readers: Vec<Box<dyn Read>>) -> Result<LoadResult> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        state.stop_words.clear();
        for reader in readers {
            for token in read_tokens(reader) {
                state.stop_words.push(token.to_lowercase());
            }
        }
        log::info!("loaded {} stop words", state.stop_words.len());
        Ok(LoadResult {
            stop_words: state.stop_words.len(),
            ..LoadResult::default()
        })
    }

    /// Append a message to the spam samples storage and learn it.
    pub fn update_spam(&self, msg: &str) -> Result<()> {
        self.update_sample(msg, SpamClass::Spam)
    }

    /// Append a message to the ham samples storage and learn it.
    pub fn update_ham(&self, msg: &str) -> Result<()> {
        self.update_sample(msg, SpamClass::Ham)
    }

    /// Append one sample and incrementally update the classifier. The
    /// classifier is left untouched when the storage append fails.
    fn update_sample(&self, msg: &str, class: SpamClass) -> Result<()> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let updater = match class {
            SpamClass::Spam => &self.spam_updater,
            SpamClass::Ham => &self.ham_updater,
        };
        let Some(updater) = updater else {
            return Ok(());
        };

        updater
            .append(msg)
            .with_context(|| format!("can't update {} samples", class))?;

        // the message goes through the sample-stream grammar, so a quoted
        // comma-separated line learns one document per piece
        let mut docs = Vec::new();
        for sample in read_tokens(Cursor::new(msg.as_bytes().to_vec())) {
            let frequency = tokenize(&sample, &state.excluded_tokens);
            docs.push(Document::from_freq(class, &frequency));
        }
        state.classifier.learn(&docs);
        Ok(())
    }

    /// Add user ids to the approved list, skipping any further checks for
    /// them.
    pub fn add_approved_users<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.approved_users
                .approve(id.as_ref(), self.config.first_messages_count);
        }
    }

    /// Remove user ids from the approved list.
    pub fn remove_approved_users<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.approved_users.remove(id.as_ref());
        }
    }

    /// Replace the approved-user list from a reader with one user id per
    /// line. Returns the number of ids loaded.
    pub fn load_approved_users(&self, reader: impl Read) -> Result<usize> {
        self.approved_users
            .load(reader, self.config.first_messages_count)
    }

    /// Snapshot of the known approved-user ids, order unspecified.
    pub fn approved_users(&self) -> Vec<String> {
        self.approved_users.snapshot()
    }

    /// Reset spam samples, classifier, excluded tokens, stop words and
    /// approved users.
    pub fn reset(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.tokenized_spam.clear();
        state.excluded_tokens.clear();
        state.stop_words.clear();
        state.classifier.reset();
        self.approved_users.clear();
    }
}
