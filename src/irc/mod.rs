//! IRC protocol layer: message codec, line framing, handler registry and the
//! connection loop.

pub mod client;
pub mod error;
pub mod framer;
pub mod handlers;
pub mod message;

pub use client::Client;
pub use error::{ClientError, CommandMissing, ProtocolError};
pub use framer::{next_token, JsonLineCodec, LineCodec};
pub use handlers::{Handler, HandlerRegistry};
pub use message::Message;
