//! Error types for Arcana

use thiserror::Error;

use crate::service::notifications::Severity;

pub type Result<T> = std::result::Result<T, ArcanaError>;

#[derive(Error, Debug)]
pub enum ArcanaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Service error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ArcanaError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ArcanaError::InvalidInput(_) => 3,
            ArcanaError::Precondition(_) => 3,
            ArcanaError::Gateway(_) => 2,
            ArcanaError::Config(_) => 1,
            ArcanaError::Storage(_) => 1,
        }
    }

    /// Human-readable message supplied by the reading service, if any
    ///
    /// Only non-success responses that carried an `error` string have one;
    /// transport failures and local errors return `None` so callers fall
    /// back to their own generic wording.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            ArcanaError::Gateway(GatewayError::Service {
                message: Some(message),
                ..
            }) => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Profile slot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Profile slot is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Service { status: u16, message: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Local validation failures, caught before any network call
///
/// The display text doubles as the notification shown to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("The mystical library is still loading")]
    NotLoaded,

    #[error("The mystical library failed to load: {0}")]
    CatalogUnavailable(String),

    #[error("Please select a reader and reading type")]
    MissingSelection,

    #[error("Unknown reader: {0}")]
    UnknownReader(String),

    #[error("Unknown reading type: {0}")]
    UnknownReadingType(String),

    #[error("Unknown coin package: {0}")]
    UnknownPackage(String),

    #[error("Insufficient coins for this reading (needs {required}, balance {available})")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("No quiz questions are available")]
    NoQuizQuestions,

    #[error("No quiz is in progress")]
    NoActiveQuiz,

    #[error("Question {0} is not part of this quiz")]
    UnknownQuestion(u32),

    #[error("Question {question_id} has no option {option}")]
    InvalidOption { question_id: u32, option: usize },

    #[error("Please answer all {total} questions before submitting ({answered} answered)")]
    QuizIncomplete { answered: usize, total: usize },

    #[error("There is no reading to show yet")]
    NoCurrentReading,
}

impl PreconditionError {
    /// Severity of the notification raised for this failure
    pub fn severity(&self) -> Severity {
        match self {
            PreconditionError::InsufficientBalance { .. }
            | PreconditionError::CatalogUnavailable(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}
