use std::{error, io};
use thiserror::Error as ThisError;

/// Boxed error returned by a failing [`Handler`](crate::Handler).
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can end a single-shot invocation early.
///
/// None of these are retried. Whatever the variant, the output stream has
/// already been closed by the time the error reaches the caller of
/// [`SingleShot::run`](crate::SingleShot::run).
#[derive(Debug, ThisError)]
pub enum Error {
    /// The request line did not contain at least a method and a path.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// The request head (request line and headers) is not valid UTF-8.
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,

    /// `Content-Length` was consulted and is not a decimal integer.
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// Scheme, host and path did not form a parsable URI.
    #[error("invalid request URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// Reading the input, writing the output or closing it failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Short machine-readable code, used as a structured logging field.
    pub const fn code(&self) -> &'static str {
        match self {
            Error::MalformedRequestLine(_) => "MALFORMED_REQUEST_LINE",
            Error::InvalidEncoding => "INVALID_ENCODING",
            Error::InvalidContentLength(_) => "INVALID_CONTENT_LENGTH",
            Error::InvalidUri { .. } => "INVALID_URI",
            Error::Handler(_) => "HANDLER_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}
