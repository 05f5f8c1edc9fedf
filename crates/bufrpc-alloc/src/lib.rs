//! Size-classed allocators over an externally supplied byte arena.
//!
//! Two strategies are provided — [`BuddyAllocator`] (power-of-two
//! splitting/coalescing) and [`BitmapAllocator`] (next-fit over a bitmap of
//! fixed-size cells) — plus [`HeapAllocator`], a `Vec<u8>`-growth stand-in
//! used by callers (notably `bufrpc-bufio`) that want the same
//! [`BlockAllocator`] contract without owning a pre-sized arena.
//!
//! Every allocation is preceded by an 8-byte header (4-byte magic, 4-byte
//! requested length) written into the arena itself; [`Block::as_slice`] and
//! [`Block::as_mut_slice`] only ever expose the bytes *after* that header.
//! Arenas are single-owner and **not** internally synchronized (spec §5) —
//! wrap an allocator in a mutex if it must cross threads.

mod bitmap;
mod buddy;
mod error;
mod heap;

pub use bitmap::BitmapAllocator;
pub use buddy::BuddyAllocator;
pub use error::AllocError;
pub use heap::HeapAllocator;

/// Magic written into the 4-byte header prefix of every live block.
pub(crate) const MAGIC: u32 = 0xA110_C0DE;
/// Header size in bytes: 4-byte magic + 4-byte requested length.
pub(crate) const HEADER_SIZE: usize = 8;

/// A single allocation returned by [`BlockAllocator::alloc`].
///
/// Aliases arena memory starting immediately after the 8-byte header; the
/// handle itself carries the bookkeeping ([`Block::offset`]) needed by
/// `free` to locate and validate that header again. It must be passed back
/// to the allocator it came from — mixing handles across allocator
/// instances is a logic error the allocator cannot detect and is not
/// supported.
pub struct Block {
    ptr: *mut u8,
    len: usize,
    /// Byte offset of the header (not the payload) within the arena.
    offset: usize,
}

impl Block {
    /// Requested length (excludes the header).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of this block's header within the arena. Exposed so
    /// untrusted callers can round-trip through [`BlockAllocator::free_at`].
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// # Safety
    /// Valid until the block is passed to `free`/`free_at`.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` points at `len` live, initialized bytes owned by the
        // arena for as long as this handle has not been freed.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// # Safety
    /// Valid until the block is passed to `free`/`free_at`.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: see `as_slice`; `&mut self` guarantees exclusive access to
        // this handle, and handles are never aliased by the allocator.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

// SAFETY: `Block` is just a typed view into arena bytes with move-only
// ownership semantics; sending it to another thread is sound as long as `T`
// (here always `u8`) is `Send`, which it is.
unsafe impl Send for Block {}

/// Common contract shared by [`BuddyAllocator`] and [`BitmapAllocator`]
/// (spec §4.1), plus [`HeapAllocator`] for callers that have no arena to
/// pre-size.
pub trait BlockAllocator {
    /// Allocate `size` bytes. Returns `None` when no block of sufficient
    /// size is available, even after an internal coalesce attempt — this is
    /// an ordinary, expected outcome (exhaustion), not a panic.
    fn alloc(&mut self, size: usize) -> Option<Block>;

    /// Release a block obtained from `alloc` on this same allocator.
    ///
    /// # Panics
    /// Panics on magic mismatch (double free or corruption) — per spec §7
    /// this is a programming error, not a recoverable `Result`.
    fn free(&mut self, block: Block);

    /// Release by raw header offset, for callers that only have an integer
    /// (e.g. recovered from a side channel) rather than a `Block` handle.
    /// Unlike `free`, corruption here is reported, not panicked on, since
    /// the offset may originate from an untrusted source.
    fn free_at(&mut self, offset: usize) -> Result<(), AllocError>;

    /// Bounds/alignment check for `offset`, without touching the header —
    /// safe to call with attacker-controlled input.
    fn is_valid_offset(&self, offset: usize) -> bool;

    /// Total bytes currently free. Invariant (spec §8): for any sequence of
    /// matched `alloc`/`free` calls, this returns to its value at
    /// construction.
    fn available(&self) -> usize;

    /// Forgets all outstanding allocations and returns the arena to its
    /// fully-free initial state.
    fn reset(&mut self);
}

pub(crate) fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
