//! The live exam: one task per connection driving greeting, question and
//! answer turns, and the timed close.
//!
//! The session reads [`ClientEvent`]s from an inbound channel and writes
//! [`OutboundFrame`]s to a bounded outbound channel; the transport adapts
//! both ends. Per turn the outbound order is `session_ending` (only when
//! closing), `dosen_reply_start`, then audio when synthesis produced any.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use mentora_core::identity::OwnedSession;
use mentora_core::protocol::{ClientEvent, CloseReason, OutboundFrame, ServerEvent};
use mentora_core::provider::{ReplyGenerator, ReplyRequest, SpeechSynthesizer};
use mentora_core::turns::{EvictionPolicy, Turn};
use mentora_core::voice::Voice;
use mentora_settings::SessionSettings;

use crate::clock::{Clock, SessionClock, TimeBudget};
use crate::demo::demo_reply;
use crate::window::ContextWindow;

pub const GREETING: &str =
    "Selamat datang di simulasi seminar proposal. Silakan mulai presentasi Anda kapan pun Anda siap.";
pub const CLOSING_NOTICE: &str = "Baik, waktu sesi Anda hampir habis. Sesi ini akan segera berakhir.";
pub const APOLOGY: &str = "Maaf, terjadi gangguan pada sistem AI saya. Bisa tolong ulangi?";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Greeting,
    Active,
    Ending,
    Closed,
}

/// Where examiner replies come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamMode {
    /// Replies from the reply-generation collaborator.
    #[default]
    Simulasi,
    /// Scripted keyword replies.
    Demo,
}

impl ExamMode {
    /// `demo` selects demonstration mode; anything else is a normal exam.
    pub fn from_query(mode: Option<&str>) -> Self {
        match mode {
            Some(m) if m.eq_ignore_ascii_case("demo") => Self::Demo,
            _ => Self::Simulasi,
        }
    }
}

/// Why [`ExamSession::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// Time ran out and the session closed normally.
    Completed,
    /// The client went away.
    Disconnected,
    /// Shut down from outside.
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub duration: Duration,
    pub warning: Duration,
    pub context_cap: usize,
    pub eviction: EvictionPolicy,
    pub reply_timeout: Duration,
    pub mode: ExamMode,
    pub voice: Voice,
}

impl SessionConfig {
    pub fn from_settings(settings: &SessionSettings, mode: ExamMode, voice: Voice) -> Self {
        Self {
            duration: settings.duration(),
            warning: settings.warning(),
            context_cap: settings.context_cap,
            eviction: settings.eviction,
            reply_timeout: settings.reply_timeout(),
            mode,
            voice,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let settings = SessionSettings::default();
        Self::from_settings(&settings, ExamMode::default(), settings.default_voice)
    }
}

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub replies: Arc<dyn ReplyGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
}

/// The outbound channel is gone.
#[derive(Debug)]
struct Disconnected;

pub struct ExamSession {
    session: OwnedSession,
    config: SessionConfig,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    budget: TimeBudget,
    window: ContextWindow,
    state: SessionState,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ExamSession {
    /// The time budget starts at the stored session's `started_at`, so a
    /// reconnect continues the same budget.
    pub fn new(
        session: OwnedSession,
        config: SessionConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        let budget = TimeBudget::new(SessionClock::new(
            session.started_at,
            config.duration,
            config.warning,
        ));
        let window = ContextWindow::new(config.context_cap, config.eviction);
        Self {
            session,
            config,
            collaborators,
            clock,
            budget,
            window,
            state: SessionState::Greeting,
            outbound,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session until it closes, the client leaves, or `cancel`
    /// fires.
    #[instrument(skip_all, fields(session_id = %self.session.id, mode = ?self.config.mode))]
    pub async fn run(mut self, mut inbound: mpsc::Receiver<ClientEvent>, cancel: CancellationToken) -> EndReason {
        info!(voice = self.config.voice.voice_name(), "session started");

        let greeted = tokio::select! {
            _ = cancel.cancelled() => None,
            r = self.greet() => Some(r),
        };
        let reason = match greeted {
            None => EndReason::Cancelled,
            Some(Err(Disconnected)) => EndReason::Disconnected,
            Some(Ok(())) => self.event_loop(&mut inbound, &cancel).await,
        };

        self.state = SessionState::Closed;
        info!(?reason, turns = self.window.len(), "session closed");
        reason
    }

    async fn event_loop(
        &mut self,
        inbound: &mut mpsc::Receiver<ClientEvent>,
        cancel: &CancellationToken,
    ) -> EndReason {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return EndReason::Cancelled,
                event = inbound.recv() => event,
            };
            let text = match event {
                Some(ClientEvent::UserTranscript { text }) => text,
                Some(ClientEvent::Unknown) => {
                    debug!("ignoring unknown client event");
                    continue;
                }
                None => return EndReason::Disconnected,
            };

            let handled = tokio::select! {
                _ = cancel.cancelled() => None,
                r = self.handle_utterance(&text) => Some(r),
            };
            match handled {
                None => return EndReason::Cancelled,
                Some(Err(Disconnected)) => return EndReason::Disconnected,
                Some(Ok(())) if self.state == SessionState::Closed => return EndReason::Completed,
                Some(Ok(())) => {}
            }
        }
    }

    async fn greet(&mut self) -> Result<(), Disconnected> {
        self.window.append(self.session.proposal.opening_turn());
        self.speak(GREETING).await?;
        self.window.append(Turn::examiner(GREETING));
        self.state = SessionState::Active;
        Ok(())
    }

    async fn handle_utterance(&mut self, raw: &str) -> Result<(), Disconnected> {
        let text = raw.trim();
        if text.is_empty() {
            debug!("empty utterance ignored");
            return Ok(());
        }
        self.window.append(Turn::candidate(text));

        if self.budget.evaluate(self.clock.now()) {
            return self.close_out().await;
        }

        let reply = match self.config.mode {
            ExamMode::Demo => demo_reply(text).to_string(),
            ExamMode::Simulasi => self.generate_reply().await,
        };
        self.window.append(Turn::examiner(reply.clone()));
        self.speak(&reply).await
    }

    async fn close_out(&mut self) -> Result<(), Disconnected> {
        self.state = SessionState::Ending;
        info!("time budget exhausted, closing session");
        self.send(OutboundFrame::Event(ServerEvent::SessionEnding)).await?;
        self.speak(CLOSING_NOTICE).await?;
        self.window.append(Turn::examiner(CLOSING_NOTICE));
        self.state = SessionState::Closed;
        // The client may hang up as soon as it has the notice.
        let _ = self.send(OutboundFrame::Close(CloseReason::normal())).await;
        Ok(())
    }

    /// Ask the reply collaborator, bounded by the reply timeout. Any failure
    /// becomes the apology.
    async fn generate_reply(&self) -> String {
        let request = ReplyRequest {
            proposal: Arc::clone(&self.session.proposal),
            history: self.window.snapshot(),
        };
        let replies = &self.collaborators.replies;
        match tokio::time::timeout(self.config.reply_timeout, replies.generate(&request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!(provider = replies.name(), "empty examiner reply, apologising");
                APOLOGY.to_string()
            }
            Ok(Err(e)) => {
                warn!(
                    provider = replies.name(),
                    error_kind = e.error_kind(),
                    error = %e,
                    "reply generation failed, apologising"
                );
                APOLOGY.to_string()
            }
            Err(_) => {
                warn!(
                    provider = replies.name(),
                    timeout_secs = self.config.reply_timeout.as_secs(),
                    "reply generation timed out, apologising"
                );
                APOLOGY.to_string()
            }
        }
    }

    /// Send the reply text, then its audio when synthesis yields any.
    async fn speak(&self, text: &str) -> Result<(), Disconnected> {
        self.send(OutboundFrame::reply(text)).await?;
        match self.collaborators.speech.synthesize(text, self.config.voice).await {
            Ok(audio) if !audio.is_empty() => self.send(OutboundFrame::Audio(audio)).await,
            Ok(_) => {
                debug!("no audio for reply");
                Ok(())
            }
            Err(e) => {
                warn!(error_kind = e.error_kind(), error = %e, "speech synthesis failed, sending text only");
                Ok(())
            }
        }
    }

    async fn send(&self, frame: OutboundFrame) -> Result<(), Disconnected> {
        self.outbound.send(frame).await.map_err(|_| Disconnected)
    }
}
