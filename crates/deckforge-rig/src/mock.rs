//! Scripted collaborators for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{ChatMessage, TextBackend};
use crate::render::{Renderer, ScreenshotResult};
use crate::research::{ResearchBackend, ResearchOutcome};
use crate::{Error, Result};

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync>;
type DelayFn = Box<dyn Fn(&[ChatMessage]) -> Duration + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with a provider error carrying this message.
    Fail(String),
}

impl MockReply {
    fn into_result(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Fail(message) => Err(Error::provider("mock", message)),
        }
    }
}

/// Text backend returning scripted replies and recording requests.
///
/// Replies are taken from the script in order; once it is empty the
/// responder (if any) answers, then the default reply.
pub struct MockBackend {
    name: String,
    script: Mutex<VecDeque<MockReply>>,
    default: Option<MockReply>,
    responder: Option<Responder>,
    delay: Option<DelayFn>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("name", &self.name)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a backend with an empty script.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(VecDeque::new()),
            default: None,
            responder: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sets the backend name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a text reply to the script.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        lock(&self.script).push_back(MockReply::Text(text.into()));
        self
    }

    /// Appends a failing reply to the script.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(MockReply::Fail(message.into()));
        self
    }

    /// Sets the reply used once the script is exhausted.
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default = Some(MockReply::Text(text.into()));
        self
    }

    /// Makes every unscripted call fail.
    pub fn always_failing(mut self, message: impl Into<String>) -> Self {
        self.default = Some(MockReply::Fail(message.into()));
        self
    }

    /// Answers unscripted calls with a function of the request.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Delays every reply by a function of the request.
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Returns every recorded request.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        lock(&self.requests).clone()
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the text of the last message of the last request.
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.requests)
            .last()
            .and_then(|messages| messages.last())
            .map(ChatMessage::text)
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Result<String> {
        if let Some(reply) = lock(&self.script).pop_front() {
            return reply.into_result();
        }
        if let Some(responder) = &self.responder {
            return responder(messages);
        }
        match &self.default {
            Some(reply) => reply.clone().into_result(),
            None => Err(Error::provider(&self.name, "no scripted reply left")),
        }
    }
}

#[async_trait]
impl TextBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        lock(&self.requests).push(messages.to_vec());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(messages)).await;
        }
        self.next_reply(messages)
    }
}

/// Renderer returning scripted screenshot results.
#[derive(Debug)]
pub struct MockRenderer {
    script: Mutex<VecDeque<ScreenshotResult>>,
    default: ScreenshotResult,
    calls: AtomicUsize,
}

impl MockRenderer {
    /// A renderer whose captures always succeed with a tiny fake PNG.
    pub fn succeeding() -> Self {
        Self::with_default(ScreenshotResult::captured(b"\x89PNG\r\n\x1a\n".to_vec()))
    }

    /// A renderer whose captures always fail with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_default(ScreenshotResult::failed(reason))
    }

    /// A renderer returning `default` once the script is exhausted.
    pub fn with_default(default: ScreenshotResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            calls: AtomicUsize::new(0),
        }
    }

    /// Appends a scripted result.
    pub fn then(self, result: ScreenshotResult) -> Self {
        lock(&self.script).push_back(result);
        self
    }

    /// Returns the number of captures requested.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn capture(&self, _code: &str, _width: u32, _height: u32) -> ScreenshotResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Research backend returning a fixed outcome.
#[derive(Debug, Clone)]
pub struct StaticResearch {
    outcome: ResearchOutcome,
}

impl StaticResearch {
    /// Creates a backend returning `outcome` for every query.
    pub fn new(outcome: ResearchOutcome) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl ResearchBackend for StaticResearch {
    fn enabled(&self) -> bool {
        !matches!(self.outcome, ResearchOutcome::Disabled)
    }

    async fn search(&self, _query: &str) -> ResearchOutcome {
        self.outcome.clone()
    }
}
