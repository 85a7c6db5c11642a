use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Please select a file before verifying PII.")]
    NoFileSelected,

    #[error("Please select an action for detected PII before applying changes.")]
    NoActionsChosen,

    #[error("PII has not been verified for the selected file yet.")]
    NotVerified,

    #[error("no detected PII field named '{0}'")]
    UnknownField(String),

    #[error("No masked file available. Apply changes first.")]
    NothingToDownload,

    #[error("unknown action '{0}' (expected redact, delete or mask)")]
    InvalidAction(String),

    #[error("Check that the redaction service is running and try again ({0}).")]
    Unreachable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("service failed ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("service rejected the request: {0}")]
    Rejected(String),

    #[error("invalid response from service: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    /// True for failures that never reached the service.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WorkflowError::NoFileSelected
                | WorkflowError::NoActionsChosen
                | WorkflowError::NotVerified
                | WorkflowError::UnknownField(_)
                | WorkflowError::NothingToDownload
        )
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            WorkflowError::Unreachable(e.to_string())
        } else if e.is_decode() {
            WorkflowError::InvalidResponse(e.to_string())
        } else {
            WorkflowError::Network(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
