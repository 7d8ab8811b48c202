use std::io;
use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("\"{0}\" is not a valid fully qualified domain name (FQDN)")]
    InvalidHostname(String),

    #[error("\"{0}\" is not a valid IP address")]
    InvalidIpAddress(String),

    #[error("at least one domain name or IP address is required")]
    EmptyRequest,

    #[error("unknown installation target: {0}")]
    UnknownTarget(String),

    #[error("invalid certificate source: {0}")]
    InvalidSource(String),

    #[error("{context}: {source}")]
    Crypto {
        context: &'static str,
        #[source]
        source: rcgen::Error,
    },

    #[error("unable to gather randomness: {0}")]
    Entropy(String),

    #[error("{context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact missing after write: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("failed to parse certificate: {0}")]
    Parse(String),

    #[error("unable to get certificate from {url}: {message}")]
    Network { url: String, message: String },
}

/// Coarse grouping of [`Error`] variants, for callers that decide policy
/// (exit codes, retries) per failure kind rather than per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidInput,
    Crypto,
    Filesystem,
    Parse,
    Network,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidHostname(_)
            | Error::InvalidIpAddress(_)
            | Error::EmptyRequest
            | Error::UnknownTarget(_)
            | Error::InvalidSource(_) => ErrorCategory::InvalidInput,
            Error::Crypto { .. } | Error::Entropy(_) => ErrorCategory::Crypto,
            Error::Io { .. } | Error::ArtifactMissing(_) => ErrorCategory::Filesystem,
            Error::Parse(_) => ErrorCategory::Parse,
            Error::Network { .. } => ErrorCategory::Network,
        }
    }

    pub(crate) fn io(context: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::Io {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn crypto(context: &'static str, source: rcgen::Error) -> Self {
        Error::Crypto { context, source }
    }

    pub(crate) fn network(url: impl ToString, message: impl ToString) -> Self {
        Error::Network {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}
