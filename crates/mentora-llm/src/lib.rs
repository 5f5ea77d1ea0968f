//! Clients for the external collaborators of a live exam: Gemini for
//! examiner replies and post-session scoring, Google Cloud Text-to-Speech
//! for the examiner's voice. [`mock`] holds scripted stand-ins for tests.

pub mod converter;
pub mod gemini;
pub mod reliable;
pub mod tts;

pub mod mock;

pub use gemini::GeminiClient;
pub use reliable::{ReliableScorer, RetryConfig};
pub use tts::GoogleSpeech;
