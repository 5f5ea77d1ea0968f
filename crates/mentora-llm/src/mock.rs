//! Scripted collaborators for deterministic tests without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use mentora_core::errors::CollaboratorError;
use mentora_core::provider::{ReplyGenerator, ReplyRequest, ScoreBreakdown, Scorer, SpeechSynthesizer};
use mentora_core::voice::Voice;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    Error(CollaboratorError),
    /// Wait, then resolve the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Replies are consumed in order; once the script runs out every call
/// fails with `InvalidRequest`.
pub struct MockReplyGenerator {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl MockReplyGenerator {
    pub fn new(script: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every requested reply, in call order.
    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ReplyGenerator for MockReplyGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &ReplyRequest) -> Result<String, CollaboratorError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        let mut current = next.ok_or_else(|| {
            CollaboratorError::InvalidRequest("mock reply script exhausted".into())
        })?;
        loop {
            match current {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    current = *inner;
                }
            }
        }
    }
}

/// Returns the same audio for every request and records what was spoken.
pub struct MockSynthesizer {
    outcome: Result<Bytes, CollaboratorError>,
    spoken: Mutex<Vec<(String, Voice)>>,
}

impl MockSynthesizer {
    pub fn new(audio: impl Into<Bytes>) -> Self {
        Self::with_outcome(Ok(audio.into()))
    }

    /// Succeeds with an empty payload.
    pub fn silent() -> Self {
        Self::with_outcome(Ok(Bytes::new()))
    }

    pub fn failing() -> Self {
        Self::with_outcome(Err(CollaboratorError::ServerError {
            status: 503,
            body: "tts unavailable".into(),
        }))
    }

    fn with_outcome(outcome: Result<Bytes, CollaboratorError>) -> Self {
        Self {
            outcome,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn spoken(&self) -> Vec<(String, Voice)> {
        self.spoken.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Bytes, CollaboratorError> {
        self.spoken.lock().push((text.to_string(), voice));
        self.outcome.clone()
    }
}

/// Outcomes are consumed in order; the last one repeats.
pub struct MockScorer {
    outcomes: Mutex<VecDeque<Result<ScoreBreakdown, CollaboratorError>>>,
    calls: AtomicUsize,
    transcripts: Mutex<Vec<String>>,
}

impl MockScorer {
    pub fn new(outcomes: Vec<Result<ScoreBreakdown, CollaboratorError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(score: ScoreBreakdown) -> Self {
        Self::new(vec![Ok(score)])
    }

    pub fn failing(error: CollaboratorError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn transcripts(&self) -> Vec<String> {
        self.transcripts.lock().clone()
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn score(&self, transcript: &str) -> Result<ScoreBreakdown, CollaboratorError> {
        let _ = self.calls.fetch_add(1, Ordering::Relaxed);
        self.transcripts.lock().push(transcript.to_string());
        let mut outcomes = self.outcomes.lock();
        let outcome = if outcomes.len() > 1 {
            outcomes.pop_front()
        } else {
            outcomes.front().cloned()
        };
        outcome.unwrap_or_else(|| Err(CollaboratorError::InvalidRequest("mock scorer has no outcome".into())))
    }
}
