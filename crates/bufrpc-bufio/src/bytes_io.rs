use bytes::{Bytes, BytesMut};

use crate::error::BufioError;

/// Reader over an in-memory `Bytes` buffer — no syscalls, no growth, just
/// cursor bookkeeping. Used where a full `Reader<R>` would be overkill,
/// e.g. decoding a payload already assembled by TTHeader framing.
pub struct BytesReader {
    buf: Bytes,
    pos: usize,
}

impl BytesReader {
    #[must_use]
    pub fn new(buf: Bytes) -> Self {
        Self { buf, pos: 0 }
    }

    fn remainder(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn peek(&self, n: usize) -> Result<&[u8], BufioError> {
        if self.remainder() < n {
            return Err(BufioError::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            )));
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    pub fn next(&mut self, n: usize) -> Result<Bytes, BufioError> {
        if self.remainder() < n {
            return Err(BufioError::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            )));
        }
        let out = self.buf.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), BufioError> {
        if self.remainder() < n {
            return Err(BufioError::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            )));
        }
        self.pos += n;
        Ok(())
    }

    #[must_use]
    pub fn read_len(&self) -> usize {
        self.pos
    }
}

/// Writer that accumulates into a single `BytesMut`, reconstructing any
/// deferred writes in one pass at `flush` — the single-copy-at-flush
/// semantics spec.md leaves as the authoritative reading for in-memory use
/// (no sink to stream to, so there is nothing to defer copying into).
pub struct BytesWriter {
    buf: BytesMut,
}

impl BytesWriter {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: BytesMut::with_capacity(cap) }
    }

    pub fn malloc(&mut self, n: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        &mut self.buf[start..start + n]
    }

    pub fn write_binary(&mut self, bs: &[u8]) {
        self.buf.extend_from_slice(bs);
    }

    #[must_use]
    pub fn written_len(&self) -> usize {
        self.buf.len()
    }

    /// Freezes the accumulated bytes. There is no partial-failure state to
    /// clean up — unlike [`crate::Writer`], nothing here is sent anywhere.
    pub fn flush(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for BytesWriter {
    fn default() -> Self {
        Self::new()
    }
}
