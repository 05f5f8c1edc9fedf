use std::cell::{Cell, RefCell, UnsafeCell};
use std::io::Read;

use tracing::trace;

use crate::config::ReaderConfig;
use crate::error::BufioError;
use crate::histogram::Histogram;

/// Default chunk capacity used until the histogram suggests otherwise.
pub const DEFAULT_BUF_SIZE: usize = 4096;
/// Above this size, `read_binary` reads straight into the caller's
/// destination instead of bouncing through the internal buffer.
pub const DIRECT_READ_THRESHOLD: usize = 4 * 1024;
/// Bound on consecutive zero-byte reads before giving up with
/// [`BufioError::NoProgress`].
pub const MAX_CONSECUTIVE_EMPTY_READS: u32 = 100;

/// Result of [`Reader::peek`]: `bytes` may be shorter than requested when
/// `err` is set (short read at EOF), but is never itself an error.
pub struct PeekResult<'a> {
    pub bytes: &'a [u8],
    pub err: Option<BufioError>,
}

/// Zero-copy buffered reader (spec §4.2).
///
/// `Next`/`Peek`/`Skip`/`ReadBinary` take `&self`: bookkeeping lives behind
/// `Cell`/`UnsafeCell` so that a window returned by one call remains valid
/// while later calls are made, exactly mirroring the "valid until the next
/// Release" contract spec.md describes. This is sound under the same
/// single-owner discipline the ring buffer in this codebase already
/// relies on (spec §5: "not safe for concurrent use by multiple tasks;
/// external synchronization is required") — `Reader` is `Send` but not
/// `Sync`.
pub struct Reader<R> {
    src: RefCell<R>,
    current: UnsafeCell<Box<[u8]>>,
    /// Bytes in `current[..filled]` are valid, read data.
    filled: Cell<usize>,
    /// Bytes in `current[..pos]` have already been consumed by `Next`/`Skip`.
    pos: Cell<usize>,
    /// Old chunks kept alive (never reused) so windows handed out before a
    /// growth remain valid until `release`.
    pending: UnsafeCell<Vec<Box<[u8]>>>,
    /// Cumulative advance since the last `release` (`ReadLen`).
    read_len: Cell<usize>,
    histogram: UnsafeCell<Histogram>,
    sticky: UnsafeCell<Option<BufioError>>,
    config: ReaderConfig,
}

// SAFETY: all interior mutability here is single-task (spec §5); no field
// is ever shared across an `&Reader` handed to two tasks at once.
unsafe impl<R: Send> Send for Reader<R> {}

impl<R: Read> Reader<R> {
    #[must_use]
    pub fn new(src: R) -> Self {
        Self::with_config(src, ReaderConfig::default())
    }

    /// Builds a reader with non-default tunables (buffer size, direct-read
    /// threshold, empty-read budget).
    #[must_use]
    pub fn with_config(src: R, config: ReaderConfig) -> Self {
        Self {
            src: RefCell::new(src),
            current: UnsafeCell::new(vec![0u8; config.initial_buf_size].into_boxed_slice()),
            filled: Cell::new(0),
            pos: Cell::new(0),
            pending: UnsafeCell::new(Vec::new()),
            read_len: Cell::new(0),
            histogram: UnsafeCell::new(Histogram::new()),
            sticky: UnsafeCell::new(None),
            config,
        }
    }

    fn check_sticky(&self) -> Result<(), BufioError> {
        // SAFETY: single-task access.
        if let Some(e) = unsafe { &*self.sticky.get() } {
            return Err(e.clone());
        }
        Ok(())
    }

    fn set_sticky(&self, e: BufioError) -> BufioError {
        let clone = e.clone();
        // SAFETY: single-task access.
        unsafe { *self.sticky.get() = Some(e) };
        clone
    }

    fn current_mut(&self) -> &mut Box<[u8]> {
        // SAFETY: single-task access; no other live reference to `current`
        // exists while this call is in progress.
        unsafe { &mut *self.current.get() }
    }

    fn remainder(&self) -> usize {
        self.filled.get() - self.pos.get()
    }

    /// Ensures at least `n` contiguous, unread bytes are buffered starting
    /// at `pos`, growing/filling as needed.
    fn ensure(&self, n: usize) -> Result<(), BufioError> {
        self.check_sticky()?;
        let mut empty_reads = 0u32;
        loop {
            if self.remainder() >= n {
                return Ok(());
            }
            let cap = self.current_mut().len();
            if self.filled.get() < cap {
                match self.fill_once() {
                    Ok(0) => {
                        empty_reads += 1;
                        if empty_reads >= self.config.max_consecutive_empty_reads {
                            return Err(self.set_sticky(BufioError::NoProgress(empty_reads)));
                        }
                    }
                    Ok(_) => empty_reads = 0,
                    Err(e) => return Err(self.set_sticky(e)),
                }
                continue;
            }
            self.grow(n)?;
        }
    }

    fn fill_once(&self) -> Result<usize, BufioError> {
        let filled = self.filled.get();
        let n = {
            let buf = self.current_mut();
            self.src.borrow_mut().read(&mut buf[filled..])?
        };
        self.filled.set(filled + n);
        Ok(n)
    }

    fn grow(&self, n: usize) -> Result<(), BufioError> {
        let remainder = self.remainder();
        let hist_max = unsafe { (*self.histogram.get()).max() };
        let needed = remainder + n;
        let target = needed.max(hist_max).max(self.config.initial_buf_size);
        let new_cap = target.next_power_of_two();

        let mut new_chunk = vec![0u8; new_cap].into_boxed_slice();
        {
            let old = self.current_mut();
            new_chunk[..remainder].copy_from_slice(&old[self.pos.get()..self.filled.get()]);
        }
        trace!(old_cap = self.current_mut().len(), new_cap, remainder, "bufio reader grow");

        let old_chunk = std::mem::replace(self.current_mut(), new_chunk);
        // SAFETY: single-task access.
        unsafe { (*self.pending.get()).push(old_chunk) };

        self.pos.set(0);
        self.filled.set(remainder);
        Ok(())
    }

    /// Returns a window of exactly `n` bytes without advancing.
    ///
    /// On a short read at EOF, `bytes` holds whatever was buffered (shorter
    /// than `n`) and `err` carries the failure — spec §4.2 requires both to
    /// be visible to the caller rather than discarding the partial data.
    pub fn peek(&self, n: usize) -> PeekResult<'_> {
        if n == 0 {
            return PeekResult { bytes: &[], err: None };
        }
        if let Err(e) = self.ensure(n) {
            let available = self.remainder();
            let start = self.pos.get();
            let buf = self.current_mut();
            // SAFETY: see `next`.
            let bytes = unsafe { std::slice::from_raw_parts(buf.as_ptr().add(start), available) };
            return PeekResult { bytes, err: Some(e) };
        }
        let start = self.pos.get();
        let buf = self.current_mut();
        // SAFETY: `buf` is heap-allocated and not moved/freed while this
        // Reader is alive; it will be retained (not reused) across any
        // future growth until `release`.
        let bytes = unsafe { std::slice::from_raw_parts(buf.as_ptr().add(start), n) };
        PeekResult { bytes, err: None }
    }

    /// Returns a window of exactly `n` bytes and advances past it.
    pub fn next(&self, n: usize) -> Result<&[u8], BufioError> {
        if n == 0 {
            return Ok(&[]);
        }
        self.ensure(n)?;
        let start = self.pos.get();
        self.pos.set(start + n);
        self.read_len.set(self.read_len.get() + n);
        let buf = self.current_mut();
        // SAFETY: see `peek`.
        Ok(unsafe { std::slice::from_raw_parts(buf.as_ptr().add(start), n) })
    }

    /// Advances past `n` bytes without materializing them.
    pub fn skip(&self, n: usize) -> Result<(), BufioError> {
        if n == 0 {
            return Ok(());
        }
        self.ensure(n)?;
        self.pos.set(self.pos.get() + n);
        self.read_len.set(self.read_len.get() + n);
        Ok(())
    }

    /// Copies up to `dst.len()` bytes; the copy is owned by the caller and
    /// survives `release`. Above [`DIRECT_READ_THRESHOLD`], bypasses the
    /// internal buffer to avoid a double copy.
    pub fn read_binary(&self, dst: &mut [u8]) -> Result<usize, BufioError> {
        if dst.is_empty() {
            return Ok(0);
        }
        self.check_sticky()?;

        let buffered = self.remainder();
        if buffered == 0 && dst.len() > self.config.direct_read_threshold {
            let n = self
                .src
                .borrow_mut()
                .read(dst)
                .map_err(|e| self.set_sticky(BufioError::Io(e)))?;
            self.read_len.set(self.read_len.get() + n);
            return Ok(n);
        }

        let to_copy = buffered.min(dst.len());
        if to_copy > 0 {
            let start = self.pos.get();
            let buf = self.current_mut();
            dst[..to_copy].copy_from_slice(&buf[start..start + to_copy]);
            self.pos.set(start + to_copy);
            self.read_len.set(self.read_len.get() + to_copy);
            return Ok(to_copy);
        }

        let n = self
            .src
            .borrow_mut()
            .read(dst)
            .map_err(|e| self.set_sticky(BufioError::Io(e)))?;
        self.read_len.set(self.read_len.get() + n);
        Ok(n)
    }

    /// `io.Reader`-shaped read: may return a short, non-error read.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize, BufioError> {
        self.read_binary(dst)
    }

    /// Cumulative advance since the last `release`.
    #[must_use]
    pub fn read_len(&self) -> usize {
        self.read_len.get()
    }

    /// Releases all pending chunks, folds the cumulative read length into
    /// the size histogram, and resets `read_len` to zero.
    ///
    /// `err` lets the caller signal whether the release follows a failed
    /// higher-level operation (recorded, not surfaced — the histogram
    /// update and buffer release happen unconditionally).
    pub fn release(&self, err: Option<&BufioError>) {
        let consumed = self.read_len.get();
        // SAFETY: single-task access.
        unsafe { (*self.histogram.get()).record(consumed) };
        unsafe { (*self.pending.get()).clear() };

        if consumed > 0 {
            let buf = self.current_mut();
            let pos = self.pos.get();
            let filled = self.filled.get();
            buf.copy_within(pos..filled, 0);
            self.filled.set(filled - pos);
            self.pos.set(0);
        }
        self.read_len.set(0);

        if let Some(e) = err {
            trace!(error = %e, "bufio reader release after error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn next_returns_requested_window() {
        let r = Reader::new(Cursor::new(b"hello world".to_vec()));
        assert_eq!(r.next(5).unwrap(), b"hello");
        assert_eq!(r.next(1).unwrap(), b" ");
        assert_eq!(r.next(5).unwrap(), b"world");
    }

    #[test]
    fn peek_does_not_advance() {
        let r = Reader::new(Cursor::new(b"abcdef".to_vec()));
        assert_eq!(r.peek(3).bytes, b"abc");
        assert_eq!(r.peek(3).bytes, b"abc");
        assert_eq!(r.next(3).unwrap(), b"abc");
        assert_eq!(r.next(3).unwrap(), b"def");
    }

    #[test]
    fn peek_short_read_returns_partial_bytes_and_error() {
        let r = Reader::new(Cursor::new(b"ab".to_vec()));
        let result = r.peek(10);
        assert_eq!(result.bytes, b"ab");
        assert!(result.err.is_some());
    }

    #[test]
    fn release_resets_read_len() {
        let r = Reader::new(Cursor::new(b"abcdef".to_vec()));
        r.next(3).unwrap();
        assert_eq!(r.read_len(), 3);
        r.release(None);
        assert_eq!(r.read_len(), 0);
        r.release(None);
        assert_eq!(r.read_len(), 0);
    }

    #[test]
    fn grows_past_default_capacity() {
        let data = vec![7u8; DEFAULT_BUF_SIZE * 3];
        let r = Reader::new(Cursor::new(data.clone()));
        let window = r.next(DEFAULT_BUF_SIZE * 2 + 10).unwrap();
        assert_eq!(window.len(), DEFAULT_BUF_SIZE * 2 + 10);
        assert!(window.iter().all(|&b| b == 7));
    }

    #[test]
    fn read_binary_large_request_bypasses_buffer() {
        let data = vec![3u8; DIRECT_READ_THRESHOLD * 2];
        let r = Reader::new(Cursor::new(data));
        let mut dst = vec![0u8; DIRECT_READ_THRESHOLD * 2];
        let mut total = 0;
        while total < dst.len() {
            let n = r.read_binary(&mut dst[total..]).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, dst.len());
        assert!(dst.iter().all(|&b| b == 3));
    }

    #[test]
    fn empty_next_is_not_an_error() {
        let r = Reader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(r.next(0).unwrap(), &[] as &[u8]);
        assert_eq!(r.peek(0).bytes, &[] as &[u8]);
    }
}
