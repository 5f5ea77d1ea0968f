use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::CollaboratorError;
use crate::sections::ProposalContext;
use crate::turns::Turn;
use crate::voice::Voice;

/// Input to the reply-generation collaborator.
#[derive(Clone, Debug)]
pub struct ReplyRequest {
    pub proposal: Arc<ProposalContext>,
    /// Snapshot of the context window, oldest first.
    pub history: Vec<Turn>,
}

/// Produces the examiner's next utterance. Output is plain text without
/// markup so it can be spoken verbatim.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &ReplyRequest) -> Result<String, CollaboratorError>;
}

/// Turns text into audio. Best-effort: an error or an empty payload means
/// "no audio for this reply".
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Bytes, CollaboratorError>;
}

/// One line of the post-session transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

/// Render transcript lines as `speaker: text`, one per line.
pub fn render_transcript(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{}: {}", l.speaker, l.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rubric scores (0–100) and written feedback for one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub relevance: u32,
    #[serde(default)]
    pub clarity: u32,
    #[serde(default)]
    pub mastery: u32,
    #[serde(default)]
    pub feedback: String,
}

impl ScoreBreakdown {
    /// Clamp every score into 0–100.
    pub fn clamped(mut self) -> Self {
        self.relevance = self.relevance.min(100);
        self.clarity = self.clarity.min(100);
        self.mastery = self.mastery.min(100);
        self
    }

    /// Mean of the three scores, rounded to two decimals.
    pub fn final_score(&self) -> f64 {
        let mean = f64::from(self.relevance + self.clarity + self.mastery) / 3.0;
        (mean * 100.0).round() / 100.0
    }
}

/// Grades a finished session from its transcript.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, transcript: &str) -> Result<ScoreBreakdown, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_rendering() {
        let lines = vec![
            TranscriptLine {
                speaker: "dosen".into(),
                text: "Silakan mulai.".into(),
            },
            TranscriptLine {
                speaker: "user".into(),
                text: "Baik pak.".into(),
            },
        ];
        assert_eq!(render_transcript(&lines), "dosen: Silakan mulai.\nuser: Baik pak.");
        assert_eq!(render_transcript(&[]), "");
    }

    #[test]
    fn final_score_rounds_to_two_decimals() {
        let score = ScoreBreakdown {
            relevance: 80,
            clarity: 70,
            mastery: 71,
            feedback: String::new(),
        };
        assert_eq!(score.final_score(), 73.67);
    }

    #[test]
    fn clamped_caps_out_of_range_scores() {
        let score = ScoreBreakdown {
            relevance: 250,
            clarity: 100,
            mastery: 0,
            feedback: "x".into(),
        }
        .clamped();
        assert_eq!(score.relevance, 100);
        assert_eq!(score.final_score(), 66.67);
    }

    #[test]
    fn breakdown_tolerates_missing_fields() {
        let score: ScoreBreakdown = serde_json::from_str(r#"{"relevance": 40}"#).unwrap();
        assert_eq!(score.clarity, 0);
        assert!(score.feedback.is_empty());
    }
}
