use std::time::Duration;

use thiserror::Error;

/// Failures raised by the HTTP client wrapper.
///
/// The `Display` text is what orchestrators show to the user, so the status
/// variant keeps the `API error: <status> <text> - <body>` shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error: {status} {status_text} - {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Network failures, timeouts, 5xx and 429 responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Decode(_) | ApiError::Request(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}

/// Input problems caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select or upload a resume first.")]
    NoResumeSelected,

    #[error("Please enter a job description.")]
    EmptyJobDescription,

    #[error("Job description is too long (max 5,000 characters).")]
    JobDescriptionTooLong { length: usize, max: usize },

    #[error("Please choose a file to upload.")]
    NoFileSelected,

    #[error("Unsupported file type '{0}'. Only PDF and DOCX files are accepted.")]
    UnsupportedFileType(String),

    #[error("File is larger than {} MB", .max / (1024 * 1024))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Could not read file: {0}")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("An upload is already in progress")]
    AlreadyUploading,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Resume {0} is already loading")]
    AlreadyLoading(i64),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("Item {0} is already being deleted")]
    AlreadyDeleting(i64),

    #[error("Nothing is loaded to delete")]
    NothingLoaded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Invalid realtime URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode realtime message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Channel join rejected: {0}")]
    JoinRejected(String),

    #[error("Realtime connection closed")]
    Closed,
}

/// Problems with a line typed into the console shell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list of commands.")]
    Unknown(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{0}' is not a valid id")]
    InvalidId(String),
}

/// Turns an error into the text shown to the user, falling back to a generic
/// message when the error renders as nothing.
pub fn user_message(err: &dyn std::error::Error, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
