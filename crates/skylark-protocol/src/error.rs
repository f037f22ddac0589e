//! Error types for the Skylark protocol layer.

use tonic::Status;

/// Result type alias using the protocol [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by protocol decoding, dispatch, and the prepared
/// statement registry. None of these are retried at this layer; they
/// propagate synchronously to the RPC caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An envelope payload did not decode against its declared type tag.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// A command type or action name the dispatcher does not recognize.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A prepared statement handle unknown to the registry.
    #[error("not found: {0}")]
    NotFound(String),

    /// The data engine rejected the query text. The engine's message is
    /// passed through verbatim.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A bind parameter or info value whose runtime type has no slot in the
    /// tagged-union scalar set.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// Arrow array or IPC failure while building a result.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl Error {
    /// Shorthand for a `MalformedCommand` from any displayable cause.
    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        Error::MalformedCommand(err.to_string())
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match &err {
            Error::MalformedCommand(_)
            | Error::InvalidArgument(_)
            | Error::InvalidQuery(_)
            | Error::UnsupportedValue(_) => Status::invalid_argument(err.to_string()),
            Error::NotFound(_) => Status::not_found(err.to_string()),
            Error::Arrow(_) => Status::internal(err.to_string()),
        }
    }
}
