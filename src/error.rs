use std::fmt;
use std::io;
use thiserror::Error;

/// Why a wait was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller cancelled the operation
    Cancelled,
    /// The operation deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "context canceled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Generic error type
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Remote API returned a non-success status
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A remote call failed at the named stage
    #[error("{stage}: {source}")]
    Remote {
        /// Stage label
        stage: &'static str,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Certificate material rejected before any remote call
    #[error("Invalid certificate material: {0}")]
    InvalidMaterial(String),

    /// The enrollment has no change in flight
    #[error("no pending changes were found on enrollment {0}")]
    NoPendingChange(i64),

    /// A location path did not end in a numeric ID
    #[error("invalid location '{0}': expected a trailing numeric ID")]
    InvalidLocation(String),

    /// Warning text contained sentences missing from the warning table
    #[error("received warnings that could not be classified: {}", quote_all(.0))]
    UnknownWarnings(Vec<String>),

    /// Recognized warnings not covered by the allow-list
    #[error("warnings cannot be approved: {}", .0.join(", "))]
    UnapprovedWarnings(Vec<String>),

    /// Pre-verification warnings block the enrollment
    #[error(
        "enrollment pre-verification returned warnings and the enrollment cannot be validated. \
         Please fix the issues or set acknowledge_pre_verification_warnings to true and retry ({source}): {warnings}"
    )]
    WarningsNotAcknowledged {
        /// Raw warning text as returned by the remote system
        warnings: String,
        /// Classification or approval failure
        #[source]
        source: Box<Error>,
    },

    /// Post-verification warnings could not be approved
    #[error(
        "uploaded certificate returned post-verification warnings that cannot be approved. \
         Please fix the issues or set acknowledge_post_verification_warnings to true and retry ({source}): {warnings}"
    )]
    PostVerificationWarningsNotApproved {
        /// Raw warning text as returned by the remote system
        warnings: String,
        /// Classification or approval failure
        #[source]
        source: Box<Error>,
    },

    /// The remote change reported an error
    #[error("change failed in status '{status}': {description}")]
    ChangeFailed {
        /// Last observed status
        status: String,
        /// Remote error description
        description: String,
    },

    /// A wait was interrupted before the expected status was observed
    #[error("retry timeout reached - error: {reason}, status: {status}")]
    Timeout {
        /// Last observed status
        status: String,
        /// Cancellation cause
        reason: CancelReason,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a remote failure with the stage it happened in
    pub fn remote(stage: &'static str, err: Error) -> Self {
        Error::Remote {
            stage,
            source: Box::new(err),
        }
    }

    /// Innermost error, looking through stage wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Remote { source, .. } => source.root(),
            other => other,
        }
    }
}

fn quote_all(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpClient(err.to_string())
    }
}
