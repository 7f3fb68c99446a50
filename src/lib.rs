//! Nihongo API - backend for a Japanese learning platform
//!
//! This library provides accounts with bearer-token authentication, the lesson
//! and vocabulary catalogue, and per-user progress tracking behind a warp
//! filter tree.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod security;
pub mod storage;
pub mod validation;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{NihongoError, Result};
pub use routes::routes;
