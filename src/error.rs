use thiserror::Error;

/// Failures of the local persistence substrate.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt value under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the club database. Messages are shown to users verbatim.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistError),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// HTTP status a REST layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Persistence(_) => 500,
        }
    }
}

/// Remote fetch problems. Never surfaced past `FootballApi::request`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid provider payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("{0} channel not configured")]
    NotConfigured(&'static str),

    #[error("missing recipient for {0}")]
    MissingRecipient(&'static str),

    #[error("provider rejected message: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("notification already {0}")]
    InvalidTransition(&'static str),

    #[error("audit log write failed: {0}")]
    Log(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
