//! Prescription Upload Domain

/// Upload workflow, history and rendering
pub mod uploads;

/// Identity sessions
pub mod session;

/// Environment configuration
pub mod config;

/// Domain errors
pub mod errors;

pub use config::Settings;
pub use errors::Error;
pub use session::{SessionContext, SessionHub, UserId};
