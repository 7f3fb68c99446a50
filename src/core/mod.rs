//! Core runtime pieces shared by every route

pub mod clock;
pub mod rate_limiter;
pub mod state;

// Re-export main components for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limiter::RequestRateLimiter;
pub use state::AppState;
