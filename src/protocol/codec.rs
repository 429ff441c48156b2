//! Line framing and message encoding for the stdio protocol.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a configurable maximum line
//! length. Unlike a bare `LinesCodec`, content problems never end the stream:
//! an oversized or non-UTF-8 line is yielded as [`Frame::Rejected`] so the
//! session can report it and keep reading. Only I/O failures on the
//! underlying stream surface as errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use stdio_toolhost::protocol::codec::LineCodec;
//!
//! let reader = FramedRead::new(tokio::io::stdin(), LineCodec::new());
//! ```

use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use super::{value_kind, Request, Response};
use crate::{AppError, Result};

/// Default maximum line length accepted on input: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Emitted when a response cannot be serialized. Unreachable for responses
/// built from `serde_json::Value`.
const ENCODE_FALLBACK: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"message":"failed to encode response"}}"#;

/// One unit of input produced by [`LineCodec`].
#[derive(Debug)]
pub enum Frame {
    /// A complete line, without its `\n` or trailing `\r`.
    Line(String),
    /// A line that could not be accepted; always an [`AppError::Decode`].
    Rejected(AppError),
}

/// Newline-delimited framing for the stdio protocol.
///
/// # Decoder
///
/// Lines longer than the configured limit yield
/// `Frame::Rejected(AppError::Decode("line too long: …"))`; the remainder of
/// that line is discarded up to the next `\n`. Invalid UTF-8 yields
/// `Frame::Rejected(AppError::Decode("invalid utf-8: …"))`.
///
/// # Encoder
///
/// Outbound strings are written as `item\n`.
#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
    max_length: usize,
}

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom maximum line length in bytes.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    /// Maximum accepted line length in bytes.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn classify(
        &self,
        decoded: std::result::Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Frame>> {
        match decoded {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                Ok(Some(Frame::Rejected(AppError::Decode(format!(
                    "line too long: exceeded {} bytes",
                    self.max_length
                )))))
            }
            Err(LinesCodecError::Io(err)) if err.kind() == ErrorKind::InvalidData => Ok(Some(
                Frame::Rejected(AppError::Decode(format!("invalid utf-8: {err}"))),
            )),
            Err(LinesCodecError::Io(err)) => Err(err.into()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let decoded = self.inner.decode(src);
        self.classify(decoded)
    }

    /// A final line without a trailing newline is still yielded at EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let decoded = self.inner.decode_eof(src);
        self.classify(decoded)
    }
}

impl Encoder<String> for LineCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.inner.encode(item, dst).map_err(|err| match err {
            LinesCodecError::Io(io_err) => AppError::from(io_err),
            LinesCodecError::MaxLineLengthExceeded => {
                AppError::Io("outbound line rejected by codec".into())
            }
        })
    }
}

/// Decode one line into a [`Request`].
///
/// # Errors
///
/// - [`AppError::Decode`]`("malformed json: …")` when the line is not JSON.
/// - [`AppError::Decode`]`("expected a JSON object, found …")` when the line
///   is JSON but not an object.
pub fn decode(line: &str) -> Result<Request> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|err| AppError::Decode(format!("malformed json: {err}")))?;

    if !value.is_object() {
        return Err(AppError::Decode(format!(
            "expected a JSON object, found {}",
            value_kind(&value)
        )));
    }

    serde_json::from_value(value).map_err(|err| AppError::Decode(format!("malformed request: {err}")))
}

/// Encode a [`Response`] as a single line of compact JSON (no newline).
#[must_use]
pub fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| ENCODE_FALLBACK.to_owned())
}
