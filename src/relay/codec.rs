//! Line framing for upstream event streams.
//!
//! Splits a byte stream on `\n`, `\r\n` or a lone `\r` without assuming
//! UTF-8, the way `LinesCodec` does for text. Lines are yielded without their
//! terminator; blank lines are yielded as empty frames and left to the relay
//! loop to drop.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

/// Errors produced while framing the upstream body.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A single line grew past the configured limit.
    #[error("upstream frame exceeds {limit} bytes")]
    TooLong { limit: usize },

    /// The upstream body failed to produce more bytes.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Decoder for newline-delimited frames with a length ceiling.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_length: usize,
    /// Bytes already scanned for a terminator; avoids rescanning on each poll.
    next_index: usize,
    /// The last line ended in `\r` at the end of a chunk; a leading `\n` in
    /// the next chunk belongs to that terminator.
    pending_cr: bool,
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            pending_cr: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn too_long(&self) -> FrameError {
        FrameError::TooLong {
            limit: self.max_length,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if self.pending_cr && !buf.is_empty() {
            self.pending_cr = false;
            if buf[0] == b'\n' {
                buf.advance(1);
            }
        }

        let terminator = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r');
        match terminator {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let line = buf.split_to(end);
                let was_cr = buf[0] == b'\r';
                buf.advance(1);
                if was_cr {
                    match buf.first() {
                        Some(b'\n') => buf.advance(1),
                        Some(_) => {}
                        None => self.pending_cr = true,
                    }
                }
                if line.len() > self.max_length {
                    return Err(self.too_long());
                }
                Ok(Some(line.freeze()))
            }
            None if buf.len() > self.max_length => Err(self.too_long()),
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        self.pending_cr = false;
        if buf.is_empty() {
            return Ok(None);
        }
        // A final line without a terminator still counts as a frame.
        let line = buf.split_to(buf.len());
        Ok(Some(line.freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(codec: &mut FrameCodec, buf: &mut BytesMut) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn splits_on_newline_and_strips_cr() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&b"data: one\r\n\r\ndata: two\n\n"[..]);
        let frames = drain(&mut codec, &mut buf);
        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"data: one"),
                Bytes::new(),
                Bytes::from_static(b"data: two"),
                Bytes::new(),
            ]
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_line_split_across_chunks() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&b"data: hel"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo\ndata: ne");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Bytes::from_static(b"data: hello")));
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"data: ne");
    }

    #[test]
    fn lone_cr_ends_a_line() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&b"data: a\rdata: b\n"[..]);
        assert_eq!(
            drain(&mut codec, &mut buf),
            vec![Bytes::from_static(b"data: a"), Bytes::from_static(b"data: b")]
        );
    }

    #[test]
    fn crlf_split_across_chunks_is_one_terminator() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&b"data: a\r"[..]);
        assert_eq!(drain(&mut codec, &mut buf), vec![Bytes::from_static(b"data: a")]);

        buf.extend_from_slice(b"\ndata: b\r\n");
        assert_eq!(drain(&mut codec, &mut buf), vec![Bytes::from_static(b"data: b")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn eof_flushes_trailing_line() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&b"data: last"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some(Bytes::from_static(b"data: last")));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn non_utf8_bytes_pass_through() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Bytes::from_static(&[0xff, 0xfe])));
    }

    #[test]
    fn rejects_overlong_line() {
        let mut codec = FrameCodec::new(4);
        let mut buf = BytesMut::from(&b"abcdefgh"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::TooLong { limit: 4 })
        ));

        let mut codec = FrameCodec::new(4);
        let mut buf = BytesMut::from(&b"abcde\n"[..]);
        assert!(codec.decode(&mut buf).is_err());
    }
}
