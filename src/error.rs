use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

/// Message used when an error response carries no `error` field.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport failed : {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned status {status} : {message}")]
    Api { status: u16, message: String },
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("validation failed : {0}")]
    Validation(String),
    #[error("I/O failed on {} : {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON response : {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL : {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Status code of an `Api` error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the provider rejected the access token.
    ///
    /// Callers should discard the persisted token and restart authorization.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}
