use std::cell::{Cell, RefCell, UnsafeCell};
use std::io::{IoSlice, Write};

use bytes::Bytes;
use tracing::trace;

use crate::config::WriterConfig;
use crate::error::BufioError;
use crate::reader::DIRECT_READ_THRESHOLD;

enum Chunk {
    Owned(Vec<u8>),
    Shared(Bytes),
}

impl Chunk {
    fn as_slice(&self) -> &[u8] {
        match self {
            Chunk::Owned(v) => v,
            Chunk::Shared(b) => b,
        }
    }
}

/// Zero-copy buffered writer (spec §4.2).
///
/// Growth finalizes (never reallocates) the current chunk: a `Malloc`
/// window handed out before a growth keeps pointing at live memory because
/// the old chunk is moved, not copied, into the finalized list — the same
/// deferred-growth discipline spec.md calls "the non-obvious heart of the
/// zero-copy contract" (§9).
pub struct Writer<W> {
    sink: RefCell<W>,
    current: UnsafeCell<Vec<u8>>,
    filled: Cell<usize>,
    finalized: UnsafeCell<Vec<Chunk>>,
    written_len: Cell<usize>,
    sticky: UnsafeCell<Option<BufioError>>,
    config: WriterConfig,
}

// SAFETY: single-task use only, mirroring `Reader` (spec §5).
unsafe impl<W: Send> Send for Writer<W> {}

impl<W: Write> Writer<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, WriterConfig::default())
    }

    /// Builds a writer with a non-default initial chunk size.
    #[must_use]
    pub fn with_config(sink: W, config: WriterConfig) -> Self {
        Self {
            sink: RefCell::new(sink),
            current: UnsafeCell::new(vec![0u8; config.initial_chunk_size]),
            filled: Cell::new(0),
            finalized: UnsafeCell::new(Vec::new()),
            written_len: Cell::new(0),
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

    fn current_mut(&self) -> &mut Vec<u8> {
        // SAFETY: single-task access; see `Reader::current_mut`.
        unsafe { &mut *self.current.get() }
    }

    fn finalized_mut(&self) -> &mut Vec<Chunk> {
        // SAFETY: single-task access.
        unsafe { &mut *self.finalized.get() }
    }

    /// Moves the current chunk (trimmed to its filled length) into the
    /// finalized list and replaces it with a fresh, empty chunk. Truncating
    /// before the move only drops unused *capacity*, never relocates the
    /// backing allocation — any `Malloc` window already handed out for
    /// `current[..filled]` stays valid.
    fn finalize_current(&self) {
        let filled = self.filled.get();
        if filled == 0 {
            return;
        }
        let mut old = std::mem::replace(self.current_mut(), vec![0u8; self.config.initial_chunk_size]);
        old.truncate(filled);
        self.finalized_mut().push(Chunk::Owned(old));
        self.filled.set(0);
    }

    fn ensure_capacity(&self, n: usize) {
        let cap = self.current_mut().len();
        if self.filled.get() + n <= cap {
            return;
        }
        self.finalize_current();
        let new_cap = n.max(self.config.initial_chunk_size).next_power_of_two();
        trace!(new_cap, "bufio writer grow");
        *self.current_mut() = vec![0u8; new_cap];
    }

    /// Returns a writable window of length `n`. The caller fills it; it
    /// must not be touched after `flush`.
    pub fn malloc(&self, n: usize) -> Result<&mut [u8], BufioError> {
        self.check_sticky()?;
        if n == 0 {
            return Ok(&mut []);
        }
        self.ensure_capacity(n);
        let start = self.filled.get();
        self.filled.set(start + n);
        self.written_len.set(self.written_len.get() + n);

        let buf = self.current_mut();
        // SAFETY: `buf` is the current chunk; `[start, start+n)` was just
        // reserved and does not overlap any previously returned window
        // (earlier windows were either already folded into a finalized
        // chunk or live at lower offsets in this same chunk).
        Ok(unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr().add(start), n) })
    }

    /// Copies `bs` in, or — above [`DIRECT_READ_THRESHOLD`] — appends it to
    /// the chunk list without copying (the caller must not mutate `bs`
    /// before `flush`; a `Bytes` clone is a refcount bump, not a copy).
    pub fn write_binary(&self, bs: Bytes) -> Result<usize, BufioError> {
        self.check_sticky()?;
        let len = bs.len();
        if len == 0 {
            return Ok(0);
        }
        if len > DIRECT_READ_THRESHOLD {
            self.finalize_current();
            self.finalized_mut().push(Chunk::Shared(bs));
            self.written_len.set(self.written_len.get() + len);
            return Ok(len);
        }
        let dst = self.malloc(len)?;
        dst.copy_from_slice(&bs);
        Ok(len)
    }

    /// Cumulative bytes placed (including direct appends) since the last
    /// flush.
    #[must_use]
    pub fn written_len(&self) -> usize {
        self.written_len.get()
    }

    /// Writes all finalized chunks plus the current chunk to the sink,
    /// using a single vectored write when the sink's writes are actually
    /// scattered and retrying on a partial vectored write. Internally
    /// owned chunks are released whether this succeeds or fails; on
    /// failure the writer becomes terminal (spec §4.2, §7 "sticky error").
    pub fn flush(&self) -> Result<(), BufioError> {
        self.check_sticky()?;
        self.finalize_current();

        let chunks = std::mem::take(self.finalized_mut());
        let mut io_slices: Vec<IoSlice<'_>> =
            chunks.iter().map(|c| IoSlice::new(c.as_slice())).collect();

        let result = (|| -> std::io::Result<()> {
            let mut slices = &mut io_slices[..];
            while !slices.is_empty() {
                let n = self.sink.borrow_mut().write_vectored(slices)?;
                if n == 0 {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "write returned zero bytes",
                    ));
                }
                IoSlice::advance_slices(&mut slices, n);
            }
            Ok(())
        })();

        self.written_len.set(0);
        // Chunks (and the `current` buffer, already emptied above) are
        // dropped here regardless of outcome.
        drop(chunks);

        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.set_sticky(BufioError::Io(e))),
        }
    }
}
