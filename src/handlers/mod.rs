//! Request handlers for the API endpoints
//!
//! Handlers never reject: they render their own outcome through
//! `RequestContext::finish`. Only the gate and body filters reject.

pub mod admin;
pub mod auth;
pub mod filters;
pub mod health;
pub mod lessons;
pub mod progress;
pub mod response;
pub mod users;
pub mod vocabulary;

pub use response::{error_response, Envelope, RequestContext};
