//! Error types for the client
//!
//! Every failure the driver can surface, grouped by where it is detected:
//! usage errors before any I/O, type errors while buffering, transport
//! errors on the socket and exceptions reported by the server.

use std::io;
use std::sync::Arc;

use chwire_protocol::{ProtocolError, ServerException};
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classes, for callers deciding what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programmer misuse, no I/O performed
    Usage,
    /// Value or row does not fit the block, no I/O performed
    Type,
    /// Socket, framing or protocol failure
    Transport,
    /// Exception reported by the server
    Server,
}

/// Errors that can occur while talking to the server
///
/// Cloneable so the terminal error of a batch can be both returned to the
/// caller and recorded on the connection for the pool.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // =========================================================================
    // Usage errors
    // =========================================================================
    /// Column index outside the batch's block
    #[error("{op}: invalid column index {index} ({columns} columns)")]
    InvalidColumnIndex {
        /// Operation that received the index
        op: &'static str,
        index: usize,
        columns: usize,
    },

    /// `send` called on a batch that was already sent
    #[error("batch has already been sent")]
    BatchAlreadySent,

    /// Operation not valid in the connection's current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Batch dropped while still holding its connection
    #[error("batch dropped before it was sent")]
    Abandoned,

    /// Direct insert rolled back by the caller
    #[error("insert rolled back")]
    RolledBack,

    // =========================================================================
    // Buffering / protocol errors
    // =========================================================================
    /// Type mismatch, wire format violation or unsupported feature
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    // =========================================================================
    // Transport errors
    // =========================================================================
    /// Socket error
    #[error("io: {0}")]
    Io(#[source] Arc<io::Error>),

    /// Deadline elapsed during I/O
    #[error("i/o deadline exceeded")]
    Timeout,

    /// Server closed the connection
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Packet valid but not expected at this point of the exchange
    #[error("unexpected packet {0} from server")]
    UnexpectedPacket(&'static str),

    /// Stream ended before the insert header block arrived
    #[error("unexpected end of stream before header block")]
    UnexpectedEndOfStream,

    // =========================================================================
    // Server errors
    // =========================================================================
    /// Exception sent by the server
    #[error("server exception: {0}")]
    Server(#[source] ServerException),

    // =========================================================================
    // Pool errors
    // =========================================================================
    /// No connection became available before the dial timeout
    #[error("timed out waiting for a pooled connection")]
    PoolTimeout,

    /// Pool has been closed
    #[error("connection pool is closed")]
    PoolClosed,
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<ServerException> for Error {
    fn from(err: ServerException) -> Self {
        Self::Server(err)
    }
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidColumnIndex { .. }
            | Self::BatchAlreadySent
            | Self::InvalidState(_)
            | Self::Abandoned
            | Self::RolledBack
            | Self::PoolClosed => ErrorKind::Usage,
            Self::Protocol(e) if e.is_type_error() => ErrorKind::Type,
            Self::Protocol(ProtocolError::InvalidColumnIndex { .. }) => ErrorKind::Usage,
            Self::Protocol(_)
            | Self::Io(_)
            | Self::Timeout
            | Self::ConnectionClosed
            | Self::UnexpectedPacket(_)
            | Self::UnexpectedEndOfStream
            | Self::PoolTimeout => ErrorKind::Transport,
            Self::Server(_) => ErrorKind::Server,
        }
    }

    /// Whether a connection whose last operation ended with this error can
    /// serve another query
    ///
    /// Only a server exception leaves the stream in a known state: the
    /// server has finished the query and is waiting for the next packet.
    pub fn is_reusable(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Server exception code, if this is a server error
    pub fn server_code(&self) -> Option<i32> {
        match self {
            Self::Server(e) => Some(e.code),
            _ => None,
        }
    }
}
