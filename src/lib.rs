//! Minimal IRC client core.
//!
//! Decodes and encodes IRC lines ([`Message`]), frames them on CR LF
//! ([`LineCodec`]) and runs a connection loop ([`Client`]) that dispatches
//! every inbound message to the registered [`Handler`]s. The transport is
//! any `AsyncRead + AsyncWrite` stream the caller provides.

pub mod config;
pub mod irc;
pub mod logging;

pub use irc::{
    next_token, Client, ClientError, CommandMissing, Handler, HandlerRegistry, JsonLineCodec,
    LineCodec, Message, ProtocolError,
};
