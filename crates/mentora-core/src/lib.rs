//! Shared vocabulary for the Mentora exam simulator: identifiers, dialogue
//! turns, extracted proposal sections, the WebSocket wire protocol, and the
//! contracts of the external collaborators (reply generation, speech
//! synthesis, scoring, identity).

pub mod errors;
pub mod identity;
pub mod ids;
pub mod protocol;
pub mod provider;
pub mod sections;
pub mod turns;
pub mod voice;
