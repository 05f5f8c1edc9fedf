use std::io::Read;

use bufrpc_bufio::Reader as BufioReader;

use crate::element::ElementType;
use crate::error::ThriftError;
use crate::skip::skip;

/// Initial guess for the byte length of a skipped value; doubled on each
/// retry until `skip` succeeds without hitting a short buffer.
const INITIAL_GUESS: usize = 32;

/// Grows `guess` geometrically, calling `try_skip(guess)` each round.
/// `try_skip` returns `Ok(total)` once enough bytes were available to skip
/// the whole value, or `Err(ThriftError::ShortBuffer { available, .. })`
/// naming how many bytes it actually had to work with. The caller is
/// exhausted (real EOF, not "just needs a bigger guess") when `available`
/// comes back smaller than what was asked for.
fn scan_total_len(
    mut try_skip: impl FnMut(usize) -> Result<usize, ThriftError>,
) -> Result<usize, ThriftError> {
    let mut guess = INITIAL_GUESS;
    loop {
        match try_skip(guess) {
            Ok(total) => return Ok(total),
            Err(ThriftError::ShortBuffer { available, .. }) if available < guess => {
                return Err(ThriftError::ShortBuffer { needed: guess, available });
            }
            Err(ThriftError::ShortBuffer { .. }) => {
                guess = guess.saturating_mul(2);
            }
            Err(e) => return Err(e),
        }
    }
}

/// SkipDecoder over a [`bufrpc_bufio::Reader`]: grows a `Peek` window until
/// the whole value fits, then takes it in one `Next` (spec §4.3 variant 1).
pub struct BufioSkipDecoder<'r, R> {
    reader: &'r BufioReader<R>,
}

impl<'r, R: Read> BufioSkipDecoder<'r, R> {
    #[must_use]
    pub fn new(reader: &'r BufioReader<R>) -> Self {
        Self { reader }
    }

    pub fn skip_next(&self, ty: ElementType) -> Result<&'r [u8], ThriftError> {
        let total = scan_total_len(|guess| {
            let result = self.reader.peek(guess);
            match skip(ty, result.bytes) {
                Ok(total) => Ok(total),
                Err(ThriftError::ShortBuffer { needed, .. }) => {
                    Err(ThriftError::ShortBuffer { needed, available: result.bytes.len() })
                }
                Err(e) => Err(e),
            }
        })?;
        Ok(self.reader.next(total)?)
    }
}

/// SkipDecoder over a raw [`std::io::Read`]: accumulates into an internal
/// growable buffer and hands back a view into it (spec §4.3 variant 2).
/// The returned slice is only valid until the next call to `skip_next`.
pub struct IoSkipDecoder<R> {
    src: R,
    buf: Vec<u8>,
    start: usize,
}

impl<R: Read> IoSkipDecoder<R> {
    #[must_use]
    pub fn new(src: R) -> Self {
        Self { src, buf: Vec::new(), start: 0 }
    }

    /// Appends to `buf` until at least `n` unread bytes are available (or
    /// the source is exhausted), returning however many ended up available.
    fn ensure_buffered(&mut self, n: usize) -> usize {
        let mut available = self.buf.len() - self.start;
        while available < n {
            let old_len = self.buf.len();
            let want = n - available;
            self.buf.resize(old_len + want, 0);
            match self.src.read(&mut self.buf[old_len..]) {
                Ok(0) => {
                    self.buf.truncate(old_len);
                    break;
                }
                Ok(got) => {
                    self.buf.truncate(old_len + got);
                    available += got;
                }
                Err(_) => {
                    self.buf.truncate(old_len);
                    break;
                }
            }
        }
        available
    }

    pub fn skip_next(&mut self, ty: ElementType) -> Result<&[u8], ThriftError> {
        let total = scan_total_len(|guess| {
            let available = self.ensure_buffered(guess);
            match skip(ty, &self.buf[self.start..self.start + available]) {
                Ok(total) => Ok(total),
                Err(ThriftError::ShortBuffer { needed, .. }) => {
                    Err(ThriftError::ShortBuffer { needed, available })
                }
                Err(e) => Err(e),
            }
        })?;
        let out = self.start..self.start + total;
        self.start += total;
        Ok(&self.buf[out])
    }
}

/// SkipDecoder over a borrowed slice: pure cursor bookkeeping, no copies
/// (spec §4.3 variant 3).
pub struct SliceSkipDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceSkipDecoder<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn skip_next(&mut self, ty: ElementType) -> Result<&'a [u8], ThriftError> {
        let remaining = &self.buf[self.pos..];
        let consumed = skip(ty, remaining)?;
        let out = &remaining[..consumed];
        self.pos += consumed;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryProtocol;
    use std::io::Cursor;

    fn sample_value() -> Vec<u8> {
        let mut buf = Vec::new();
        BinaryProtocol::append_string(&mut buf, "hello");
        buf
    }

    #[test]
    fn slice_decoder_returns_exact_bytes() {
        let data = sample_value();
        let mut d = SliceSkipDecoder::new(&data);
        let out = d.skip_next(ElementType::String).unwrap();
        assert_eq!(out, &data[..]);
    }

    #[test]
    fn io_decoder_returns_exact_bytes_for_small_guess() {
        let data = sample_value();
        let mut d = IoSkipDecoder::new(Cursor::new(data.clone()));
        let out = d.skip_next(ElementType::String).unwrap();
        assert_eq!(out, &data[..]);
    }

    #[test]
    fn io_decoder_handles_value_larger_than_initial_guess() {
        let mut buf = Vec::new();
        BinaryProtocol::append_string(&mut buf, &"x".repeat(INITIAL_GUESS * 4));
        let mut d = IoSkipDecoder::new(Cursor::new(buf.clone()));
        let out = d.skip_next(ElementType::String).unwrap();
        assert_eq!(out, &buf[..]);
    }

    #[test]
    fn bufio_decoder_returns_exact_bytes() {
        let data = sample_value();
        let r = BufioReader::new(Cursor::new(data.clone()));
        let d = BufioSkipDecoder::new(&r);
        let out = d.skip_next(ElementType::String).unwrap();
        assert_eq!(out, &data[..]);
    }
}
