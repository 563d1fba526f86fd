//! Tabula API Library
//!
//! This crate provides the HTTP boundary: multipart submission, template download, ledger
//! lookups, JWT caller resolution and application setup.

// Module declarations
mod handlers;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use auth::JwtAuthenticator;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
