use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used at the command boundary to pick a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFormat,
    NotFound,
    Network,
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageFailure {
    #[error("{0}")]
    Io(#[source] io::Error),

    #[error("malformed store: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("could not encode store: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("could not replace store: {0}")]
    Persist(#[source] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid MAC address `{0}`")]
    InvalidFormat(String),

    #[error("host name must not be empty")]
    InvalidName,

    #[error("invalid namespace `{0}`")]
    InvalidNamespace(String),

    #[error("no MAC address registered for `{0}`")]
    NotFound(String),

    #[error("failed to send wake packet: {0}")]
    Network(#[from] io::Error),

    #[error("wake packet not sent within {0:?}")]
    Timeout(Duration),

    #[error("store {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: StorageFailure,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidFormat(_) | Error::InvalidName | Error::InvalidNamespace(_) => {
                ErrorKind::InvalidFormat
            }
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Network(_) | Error::Timeout(_) => ErrorKind::Network,
            Error::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: StorageFailure) -> Self {
        Error::Storage { path: path.into(), source }
    }
}
