// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const API_PREFIX: &str = "api";
pub const API_VERSION: &str = "1.0.0";

// Credentials
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;
pub const MAX_TOKEN_LENGTH: usize = 2048;

// Rate limiting: 100 requests per 15 minutes per client address
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
pub const MAX_TRACKED_CLIENTS: usize = 10_000;

// Request bodies
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

// Account validation limits
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 20;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const STUDY_TIME_MIN_MINUTES: u32 = 5;
pub const STUDY_TIME_MAX_MINUTES: u32 = 480;

// Progress
pub const MAX_SCORE: u32 = 100;

// Listing defaults
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_PRACTICE_SIZE: usize = 10;
pub const DEFAULT_REVIEW_SIZE: usize = 20;
pub const DEFAULT_TEST_SIZE: usize = 15;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const DEFAULT_ADMIN_PAGE_SIZE: usize = 20;
pub const TEST_DISTRACTORS: usize = 3;
pub const MAX_PAGE_SIZE: usize = 100;
