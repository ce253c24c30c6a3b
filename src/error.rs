use thiserror::Error;

/// Failures talking to the Canvas API. Any of these aborts the run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to send request to {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API request failed with status {status} for URL {url}\nResponse body: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },
    #[error("failed to parse JSON response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid Canvas API URL {0:?}")]
    InvalidUrl(String),
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Input data the lateness calculation cannot trust.
#[derive(Error, Debug, PartialEq)]
pub enum ProcessError {
    #[error("invalid timestamp {value:?} in {field}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("assignment {assignment_id} is missing required field {field}")]
    MissingField {
        assignment_id: u64,
        field: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Worth retrying: the request never completed or the server failed.
    /// Client errors (bad token, unknown course) fail the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => status.is_server_error(),
            FetchError::Decode { .. } | FetchError::InvalidUrl(_) | FetchError::Client(_) => false,
        }
    }
}
