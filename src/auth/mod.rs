//! Authentication and authorization module

pub mod authenticator;
pub mod gates;
pub mod password;
pub mod token;
pub mod user;

// Re-export main components
pub use authenticator::authenticate;
pub use gates::{authorize_resource, require_admin, require_level, ResourceKind, ResourceParams};
pub use password::{Argon2PasswordService, PasswordService};
pub use token::{Claims, TokenManager};
pub use user::{Level, User, UserRole};
