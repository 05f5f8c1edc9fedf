use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use bufrpc_alloc::{BlockAllocator, HeapAllocator};

/// Process-wide toggle that trades memory locality for allocation count
/// when `BinaryProtocol` reads strings/binaries (spec §6, §9). Off by
/// default. Decode paths never require strict consistency across
/// observers, so a plain atomic (rather than a mutex-guarded flag) is
/// sufficient.
static SPAN_CACHE: AtomicBool = AtomicBool::new(false);

pub fn set_span_cache(enabled: bool) {
    SPAN_CACHE.store(enabled, Ordering::Relaxed);
}

#[must_use]
pub fn span_cache_enabled() -> bool {
    SPAN_CACHE.load(Ordering::Relaxed)
}

/// Shared arena the span cache copies through when enabled. A `HeapAllocator`
/// is not a true fixed arena, but it is the same `BlockAllocator` contract
/// `bufrpc-bufio`'s growth path is built on, so routing the copy through it
/// (rather than a plain `Vec`) is the literal "copy-by-arena" spec §6 asks
/// for: an allocation that passes through the shared header/accounting path
/// instead of a bare heap allocation private to this one call.
static ARENA: OnceLock<Mutex<HeapAllocator>> = OnceLock::new();

/// How many times the arena path has actually run, for tests/observers that
/// want to see the toggle take effect without reaching into the arena
/// itself.
static ARENA_COPIES: AtomicUsize = AtomicUsize::new(0);

fn arena() -> &'static Mutex<HeapAllocator> {
    ARENA.get_or_init(|| Mutex::new(HeapAllocator::new()))
}

#[must_use]
pub fn arena_copy_count() -> usize {
    ARENA_COPIES.load(Ordering::Relaxed)
}

/// Copy `bytes` into an owned `Vec<u8>`, routing the copy through the shared
/// arena allocator when the span cache is enabled and through a plain `Vec`
/// copy otherwise. Both paths return a buffer the caller owns outright; the
/// arena-backed allocation is freed again immediately after the copy out,
/// since the `Block` handle cannot itself outlive this call.
pub(crate) fn copy_bytes(bytes: &[u8]) -> Vec<u8> {
    if !span_cache_enabled() {
        return bytes.to_vec();
    }

    let mut guard = arena().lock().unwrap();
    let Some(mut block) = guard.alloc(bytes.len()) else {
        return bytes.to_vec();
    };
    block.as_mut_slice().copy_from_slice(bytes);
    let out = block.as_slice().to_vec();
    guard.free(block);
    drop(guard);
    ARENA_COPIES.fetch_add(1, Ordering::Relaxed);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both tests touch the same process-wide flag, so each leaves it in a
    // known state rather than asserting a shared "initial" value.

    #[test]
    fn toggles_on() {
        set_span_cache(true);
        assert!(span_cache_enabled());
    }

    #[test]
    fn toggles_off() {
        set_span_cache(false);
        assert!(!span_cache_enabled());
    }

    #[test]
    fn copy_bytes_routes_through_arena_only_when_enabled() {
        set_span_cache(false);
        let before = arena_copy_count();
        assert_eq!(copy_bytes(b"hello"), b"hello".to_vec());
        assert_eq!(arena_copy_count(), before);

        set_span_cache(true);
        assert_eq!(copy_bytes(b"hello"), b"hello".to_vec());
        assert_eq!(arena_copy_count(), before + 1);
        set_span_cache(false);
    }
}
