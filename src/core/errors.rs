use std::fmt;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 1000-1099: Record/query shape errors
    InvalidShape = 1001,

    /// 1100-1199: Identity/backend consistency errors
    NotFound = 1101,

    /// 1200-1299: Backend algorithm errors
    BackendFailure = 1201,

    /// 1300-1399: Persistence errors
    PersistenceCorrupt = 1301,

    /// 1400-1499: Configuration errors
    InvalidConfiguration = 1401,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidShape => "INVALID_SHAPE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BackendFailure => "BACKEND_FAILURE",
            ErrorCode::PersistenceCorrupt => "PERSISTENCE_CORRUPT",
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndexError {
    /// Record or query byte length does not match dimensions * element size.
    /// Rejected before any backend call.
    InvalidShape { expected: usize, got: usize },
    /// Identity layer and backend state disagree about an internal id.
    /// This is a consistency-invariant violation, not a routine miss.
    NotFound(String),
    /// The backend algorithm failed; carries the original message.
    BackendFailure(String),
    /// Malformed on-disk bytes during load. The whole load fails.
    PersistenceCorrupt(String),
    /// Structural configuration rejected at construction time.
    InvalidConfiguration(String),
}

impl IndexError {
    pub fn code(&self) -> ErrorCode {
        match self {
            IndexError::InvalidShape { .. } => ErrorCode::InvalidShape,
            IndexError::NotFound(_) => ErrorCode::NotFound,
            IndexError::BackendFailure(_) => ErrorCode::BackendFailure,
            IndexError::PersistenceCorrupt(_) => ErrorCode::PersistenceCorrupt,
            IndexError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::InvalidShape { expected, got } => {
                write!(
                    f,
                    "[{}] Vector blob size ({}) does not match index's expected size ({})",
                    self.code().as_str(),
                    got,
                    expected
                )
            }
            IndexError::NotFound(context) => {
                write!(f, "[{}] Not found: {}", self.code().as_str(), context)
            }
            IndexError::BackendFailure(message) => {
                write!(f, "[{}] Backend error: {}", self.code().as_str(), message)
            }
            IndexError::PersistenceCorrupt(message) => {
                write!(f, "[{}] Corrupt index data: {}", self.code().as_str(), message)
            }
            IndexError::InvalidConfiguration(message) => {
                write!(f, "[{}] Invalid configuration: {}", self.code().as_str(), message)
            }
        }
    }
}

impl std::error::Error for IndexError {}

pub type Result<T> = std::result::Result<T, IndexError>;
