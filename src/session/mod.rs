//! Chat session management
//!
//! This module provides the `ChatSession` abstraction that manages:
//! - Authentication and the EVI websocket connection
//! - Microphone capture and audio forwarding
//! - Applying inbound events to the state holder (`EventReducer`)
//! - Cancellation and session statistics

mod config;
mod reducer;
mod session;
mod stats;

pub use config::SessionConfig;
pub use reducer::{EventReducer, HandlerError};
pub use session::ChatSession;
pub use stats::SessionStats;
