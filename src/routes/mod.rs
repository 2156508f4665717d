//! Router Module Index
//!
//! Splits the HTTP surface by concern. `create_router` in `lib.rs` nests the credential
//! and resource routers under `/api/v1` and mounts the system routes at the root.

/// Liveness and status endpoints, outside the versioned prefix.
pub mod system;

/// Registration, login and the user projections.
pub mod auth;

/// The record collections: clothing items, plus testimonials and comments when enabled.
pub mod resources;
