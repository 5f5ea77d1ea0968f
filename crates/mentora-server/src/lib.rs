//! HTTP and WebSocket surface of the exam simulator: proposal upload,
//! scoring, history, and the live exam channel.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod server;
pub mod ws;

pub use auth::JwtVerifier;
pub use error::ApiError;
pub use registry::LiveSessions;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
