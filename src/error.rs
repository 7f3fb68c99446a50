use std::error::Error;
use std::fmt;

/// Coarse error classes, each owning exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    RateLimited,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RateLimited => 429,
            ErrorKind::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NihongoError {
    // Input errors
    ValidationError { message: String, errors: Vec<String> },

    // Authentication errors
    MissingToken,
    InvalidToken,
    ExpiredToken,
    IdentityNotFound,
    IdentityInactive,
    InvalidCredentials,

    // Authorization errors
    Forbidden(String),

    // Lookup and uniqueness errors
    NotFound(String),
    ConflictError(String),

    // Abuse protection
    RateLimited,

    // System errors
    StorageError(String),
    PasswordHashError(String),
    TokenError(String),
    SystemError(String),

    // Configuration errors
    ConfigError(String),
}

impl NihongoError {
    /// Validation failure with the generic headline and a list of field problems
    pub fn validation(errors: Vec<String>) -> Self {
        Self::ValidationError {
            message: "Dados de validação inválidos".to_string(),
            errors,
        }
    }

    /// Validation failure carrying a single message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError { .. } => ErrorKind::Validation,
            Self::MissingToken
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::IdentityNotFound
            | Self::IdentityInactive
            | Self::InvalidCredentials => ErrorKind::Authentication,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConflictError(_) => ErrorKind::Conflict,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::StorageError(_)
            | Self::PasswordHashError(_)
            | Self::TokenError(_)
            | Self::SystemError(_)
            | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Message that is safe to send to the caller.
    ///
    /// Internal failures always collapse to the generic server error text; the
    /// underlying detail is only reachable through `Display`.
    pub fn public_message(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::MissingToken => "Token de acesso não fornecido".to_string(),
            Self::InvalidToken => "Token inválido".to_string(),
            Self::ExpiredToken => "Token expirado".to_string(),
            Self::IdentityNotFound => "Usuário não encontrado".to_string(),
            Self::IdentityInactive => "Conta de usuário desativada".to_string(),
            Self::InvalidCredentials => "Email ou senha incorretos".to_string(),
            Self::Forbidden(msg) => msg.clone(),
            Self::NotFound(msg) => msg.clone(),
            Self::ConflictError(msg) => msg.clone(),
            Self::RateLimited => {
                "Muitas requisições deste IP, tente novamente mais tarde.".to_string()
            }
            Self::StorageError(_)
            | Self::PasswordHashError(_)
            | Self::TokenError(_)
            | Self::SystemError(_)
            | Self::ConfigError(_) => "Erro interno do servidor".to_string(),
        }
    }

    /// Field-level problems attached to a validation failure
    pub fn field_errors(&self) -> &[String] {
        match self {
            Self::ValidationError { errors, .. } => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for NihongoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { message, errors } if errors.is_empty() => {
                write!(f, "Validation error: {}", message)
            }
            Self::ValidationError { message, errors } => {
                write!(f, "Validation error: {} ({})", message, errors.join(", "))
            }
            Self::MissingToken => write!(f, "Missing bearer token"),
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::ExpiredToken => write!(f, "Token expired"),
            Self::IdentityNotFound => write!(f, "Token subject does not exist"),
            Self::IdentityInactive => write!(f, "Token subject is deactivated"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::ConflictError(msg) => write!(f, "Conflict: {}", msg),
            Self::RateLimited => write!(f, "Rate limit exceeded"),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::PasswordHashError(msg) => write!(f, "Password hashing error: {}", msg),
            Self::TokenError(msg) => write!(f, "Token error: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for NihongoError {}

impl warp::reject::Reject for NihongoError {}

impl From<tokio::task::JoinError> for NihongoError {
    fn from(err: tokio::task::JoinError) -> Self {
        NihongoError::SystemError(format!("Blocking task failed: {}", err))
    }
}

impl From<serde_json::Error> for NihongoError {
    fn from(err: serde_json::Error) -> Self {
        NihongoError::SystemError(format!("Serialization failed: {}", err))
    }
}

// Generic result type for the API
pub type Result<T> = std::result::Result<T, NihongoError>;
