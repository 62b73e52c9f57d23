//! CR LF line framing.
//!
//! [`next_token`] is the pure scanning step; [`LineCodec`] drives it from a
//! tokio [`Decoder`] so it can sit under `FramedRead`/`FramedWrite`.
//! [`JsonLineCodec`] stacks message decoding and JSON projection on top,
//! for the diagnostic view.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::irc::error::ProtocolError;
use crate::irc::message::Message;

const DELIMITER: &[u8] = b"\r\n";

/// Default line limit, in bytes, delimiter excluded.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Scan `buf` for the next CR LF terminated line.
///
/// Returns `Some((consumed, line))` with the delimiter excluded from `line`
/// but counted in `consumed`. When `at_end` is set, an undelimited remainder
/// is returned whole as the final line. `None` means either "need more data"
/// (`at_end == false`) or "stream finished" (`at_end` with an empty buffer);
/// nothing is consumed in both cases.
pub fn next_token(buf: &[u8], at_end: bool) -> Option<(usize, &[u8])> {
    if at_end && buf.is_empty() {
        return None;
    }
    if let Some(i) = find_delimiter(buf, 0) {
        return Some((i + DELIMITER.len(), &buf[..i]));
    }
    if at_end {
        return Some((buf.len(), buf));
    }
    None
}

fn find_delimiter(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(DELIMITER.len())
        .position(|w| w == DELIMITER)
        .map(|i| i + from)
}

/// Reject bytes that would split or truncate an outbound line.
pub fn validate_line(line: &str) -> Result<(), ProtocolError> {
    match line.chars().find(|c| matches!(c, '\r' | '\n' | '\0')) {
        Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
        None => Ok(()),
    }
}

/// Codec that splits a byte stream into CR LF lines.
///
/// Decoded items are the line bytes without the delimiter. Encoding appends
/// CR LF to the given line.
#[derive(Debug, Clone)]
pub struct LineCodec {
    // Bytes of the buffered partial line already scanned for CR LF.
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self { next_index: 0, max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn take_line(&mut self, src: &mut BytesMut, at_end: bool) -> Result<Option<BytesMut>, ProtocolError> {
        // A CR may already be buffered while its LF is still in flight.
        let from = self.next_index.saturating_sub(DELIMITER.len() - 1).min(src.len());
        let (consumed, line_len) = match find_delimiter(&src[..], from) {
            Some(i) => (i + DELIMITER.len(), i),
            None if at_end && !src.is_empty() => (src.len(), src.len()),
            None if at_end => return Ok(None),
            None => {
                self.next_index = src.len();
                // A partial line that already blew the limit will never shrink.
                if src.len() > self.max_len + DELIMITER.len() {
                    return Err(ProtocolError::LineTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                return Ok(None);
            }
        };
        self.next_index = 0;

        if line_len > self.max_len {
            return Err(ProtocolError::LineTooLong {
                actual: line_len,
                limit: self.max_len,
            });
        }

        let mut line = src.split_to(consumed);
        line.truncate(line_len);
        Ok(Some(line))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
        self.take_line(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
        self.take_line(src, true)
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        validate_line(&line)?;
        dst.reserve(line.len() + DELIMITER.len());
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(DELIMITER);
        Ok(())
    }
}

/// Codec that yields each framed line as the JSON form of its [`Message`].
///
/// Lines that fail to decode surface as [`ProtocolError::Decode`].
#[derive(Debug, Clone, Default)]
pub struct JsonLineCodec {
    inner: LineCodec,
}

impl JsonLineCodec {
    pub fn new(inner: LineCodec) -> Self {
        Self { inner }
    }

    fn project(line: Option<BytesMut>) -> Result<Option<String>, ProtocolError> {
        let Some(line) = line else {
            return Ok(None);
        };
        let msg = Message::decode(&line)?;
        Ok(Some(serde_json::to_string(&msg)?))
    }
}

impl Decoder for JsonLineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        Self::project(self.inner.decode(src)?)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        Self::project(self.inner.decode_eof(src)?)
    }
}
