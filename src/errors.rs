//! Error types.

/// Errors returned by [stubdns](crate).
#[derive(thiserror::Error, Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A required argument is missing or malformed (e.g. an invalid label or name).
    #[error("invalid arguments: {0}")]
    InvalidArgs(&'static str),

    /// The operation is not possible in the current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The client is already started.
    #[error("client is already started")]
    Already,

    /// A message or query buffer could not be allocated, or an output buffer is too small.
    #[error("insufficient buffer space")]
    NoBufs,

    /// No response was received after all transmit attempts.
    #[error("no response after all transmit attempts")]
    ResponseTimeout,

    /// The server responded with a failure RCODE.
    #[error("server failure response: rcode {0}")]
    FailedResponse(u8),

    /// The name does not exist, or an index is past the end of a record list.
    #[error("no matching record found")]
    NotFound,

    /// A received message is malformed.
    #[error("malformed message")]
    Parse,

    /// The client was stopped while the query was in flight.
    #[error("client stopped while query was in flight")]
    Aborted,
}

/// Result returned by [stubdns](crate).
pub type Result<T> = std::result::Result<T, Error>;
