//! Deterministic scripted implementation of the `chat_backend` contract.
//!
//! This crate contains no transport logic and is intended for offline runs and
//! contract-level tests of the query pipeline and console runtime.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_backend::{BackendError, ChatBackend, ChatMessage};

/// Stable backend identifier used for explicit startup selection.
pub const MOCK_BACKEND_ID: &str = "mock";

const DEFAULT_REPLY: &str = "INSUFFICIENT DATA. STATE YOUR QUERY.";

/// Outcome a scripted model produces for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Text(String),
    Fail(BackendError),
    /// Panics inside `chat`; exercises the caller's unwind guard.
    Panic(String),
}

impl ScriptedReply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// One recorded `chat` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct ModelScript {
    queued: VecDeque<ScriptedReply>,
    standing: Option<ScriptedReply>,
}

/// Scripted backend with per-model replies and call recording.
///
/// Models without a script answer with the catch-all reply when one is set
/// and fail with [`BackendError::ModelNotFound`] otherwise.
#[derive(Debug)]
pub struct MockBackend {
    scripts: Mutex<HashMap<String, ModelScript>>,
    catch_all: Option<ScriptedReply>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Duration,
}

impl MockBackend {
    /// Creates a backend with no scripted models and no catch-all reply.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            catch_all: None,
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Sets the standing reply for `model`.
    #[must_use]
    pub fn with_reply(self, model: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_script(model, ScriptedReply::text(text))
    }

    /// Makes every call to `model` fail with `error`.
    #[must_use]
    pub fn with_failure(self, model: impl Into<String>, error: BackendError) -> Self {
        self.with_script(model, ScriptedReply::Fail(error))
    }

    /// Sets the standing outcome for `model`.
    #[must_use]
    pub fn with_script(self, model: impl Into<String>, reply: ScriptedReply) -> Self {
        lock_unpoisoned(&self.scripts)
            .entry(model.into())
            .or_default()
            .standing = Some(reply);
        self
    }

    /// Sets the reply used for models without a script.
    #[must_use]
    pub fn with_catch_all(mut self, reply: ScriptedReply) -> Self {
        self.catch_all = Some(reply);
        self
    }

    /// Delays every call by `latency` before answering.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queues a one-shot outcome for `model`, consumed before its standing reply.
    pub fn push_reply(&self, model: impl Into<String>, reply: ScriptedReply) {
        lock_unpoisoned(&self.scripts)
            .entry(model.into())
            .or_default()
            .queued
            .push_back(reply);
    }

    /// Returns every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock_unpoisoned(&self.calls).clone()
    }

    /// Returns the model identifiers attempted so far, in order.
    #[must_use]
    pub fn attempted_models(&self) -> Vec<String> {
        lock_unpoisoned(&self.calls)
            .iter()
            .map(|call| call.model.clone())
            .collect()
    }

    fn next_reply(&self, model: &str) -> Option<ScriptedReply> {
        let mut scripts = lock_unpoisoned(&self.scripts);
        match scripts.get_mut(model) {
            Some(script) => script
                .queued
                .pop_front()
                .or_else(|| script.standing.clone())
                .or_else(|| self.catch_all.clone()),
            None => self.catch_all.clone(),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new().with_catch_all(ScriptedReply::text(DEFAULT_REPLY))
    }
}

impl ChatBackend for MockBackend {
    fn backend_id(&self) -> &str {
        MOCK_BACKEND_ID
    }

    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, BackendError> {
        lock_unpoisoned(&self.calls).push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
        });

        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        match self.next_reply(model) {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(error)) => Err(error),
            Some(ScriptedReply::Panic(message)) => panic!("{message}"),
            None => Err(BackendError::ModelNotFound {
                model: model.to_string(),
            }),
        }
    }

    fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let mut models: Vec<String> = lock_unpoisoned(&self.scripts).keys().cloned().collect();
        models.sort();
        Ok(models)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
