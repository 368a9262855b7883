use thiserror::Error;

/// Errors raised by the similarity engine and its snapshot store.
///
/// Missing shortest paths and zero-magnitude vectors are not errors: the
/// former resolve to an empty path and the latter to a similarity of 0.0.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot encoding error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("snapshot meta error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidArgument(msg.into())
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SimError::Io { path: path.display().to_string(), source }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Failure of the fetch collaborator for a single document id.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request for {id} failed: {reason}")]
    Request { id: String, reason: String },

    #[error("{id} returned HTTP {status}")]
    Status { id: String, status: u16 },

    #[error("{id} is not an html document ({content_type})")]
    NotHtml { id: String, content_type: String },

    #[error("{id} body exceeds {limit} bytes")]
    TooLarge { id: String, limit: usize },

    #[error("{id} has no extractable text")]
    Empty { id: String },
}
