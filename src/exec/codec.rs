//! Line framing for the child's stdout.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] without a length cap: each line is
//! an opaque unit and may be arbitrarily long. A trailing `\r` is stripped, and
//! a final line without a terminating `\n` is still yielded at EOF.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Newline-delimited text decoder for exec output.
///
/// # Examples
///
/// ```rust,ignore
/// use tokio_util::codec::FramedRead;
/// use codex_exec_bridge::exec::codec::ExecLineCodec;
///
/// let lines = FramedRead::new(child_stdout, ExecLineCodec::new());
/// ```
#[derive(Debug)]
pub struct ExecLineCodec(LinesCodec);

impl ExecLineCodec {
    /// Create a codec with no line-length limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new())
    }
}

impl Default for ExecLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ExecLineCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

fn map_codec_error(e: LinesCodecError) -> AppError {
    AppError::Io(format!("stdout read failed: {e}"))
}
