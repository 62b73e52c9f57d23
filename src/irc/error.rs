//! Error types for the codec, the framer and the client loop.

use std::fmt;

use thiserror::Error;

use crate::irc::message::Message;

/// A line (or message) has no command token.
///
/// Carries whatever was recovered before the failure: the partially
/// populated [`Message`] when decoding, the bytes assembled so far when
/// encoding. Callers decide whether the partial value is usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command missing")]
pub struct CommandMissing<T: fmt::Debug> {
    pub partial: T,
}

impl<T: fmt::Debug> CommandMissing<T> {
    pub fn new(partial: T) -> Self {
        Self { partial }
    }

    /// Discard the error and keep the partial value.
    pub fn into_partial(self) -> T {
        self.partial
    }
}

/// Framing and codec errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error from the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the configured maximum length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong { actual: usize, limit: usize },

    /// An outbound line contains CR, LF or NUL.
    #[error("illegal control character {0:?} in outbound line")]
    IllegalControlChar(char),

    /// A framed line could not be decoded into a message.
    #[error("invalid line: {0}")]
    Decode(#[from] CommandMissing<Message>),

    /// JSON projection of a decoded message failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by [`Client`](crate::irc::client::Client).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Reading from the transport failed. Always terminal for the loop.
    #[error("read failed: {0}")]
    Read(#[source] ProtocolError),

    /// Writing a line to the transport failed.
    #[error("write failed: {0}")]
    Write(#[source] ProtocolError),

    /// An outbound message could not be encoded.
    #[error("cannot encode message: {0}")]
    Encode(#[from] CommandMissing<String>),

    /// `run` was called on a client whose loop already started.
    #[error("client loop is already running")]
    AlreadyRunning,

    /// Reported by handler code through the warning or fatal signal.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
