//! The `Ring`: owns the three mmap'd regions (SQ ring, CQ ring, SQE
//! array) and exposes `get_sqe`/`submit`/`peek_cqe`/`advance_cq` (spec
//! §4.5 "Ring primitives"). Requires `IORING_FEAT_SINGLE_MMAP`; the
//! split-mmap fallback for pre-5.4 kernels is not implemented.
use std::os::raw::c_void;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::abi::{
    IoUringCqe, IoUringParams, IoUringSqe, IORING_ENTER_GETEVENTS, IORING_FEAT_SINGLE_MMAP,
    IORING_OFF_CQ_RING, IORING_OFF_SQES, IORING_OFF_SQ_RING,
};
use crate::error::RingError;
use crate::syscall::{io_uring_enter, io_uring_setup};

unsafe fn atomic_u32_at<'a>(base: *mut u8, offset: u32) -> &'a AtomicU32 {
    &*(base.add(offset as usize) as *const AtomicU32)
}

struct Mmap {
    ptr: *mut c_void,
    len: usize,
}

impl Mmap {
    fn new(fd: i32, len: usize, offset: i64) -> Result<Self, RingError> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_POPULATE,
                fd,
                offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(RingError::Mmap(std::io::Error::last_os_error()));
        }
        Ok(Mmap { ptr, len })
    }

    fn as_ptr(&self) -> *mut u8 {
        self.ptr as *mut u8
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr, self.len);
        }
    }
}

/// A single io_uring instance: one submission queue, one completion
/// queue, backed by a shared ring fd.
pub struct Ring {
    fd: i32,
    sq_mmap: Mmap,
    sqes_mmap: Mmap,
    params: IoUringParams,
    sq_mask: u32,
    cq_mask: u32,
    /// Local tail cursor for SQE allocation. Only ever touched by the
    /// single thread that calls `get_sqe`/`submit`; `AtomicU32` here is
    /// just so `Ring` can be shared behind an `Arc` without also needing
    /// `&mut self`, not for cross-thread coordination.
    sqe_tail: AtomicU32,
    submit_lock: Mutex<()>,
}

unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    pub fn new(entries: u32) -> Result<Self, RingError> {
        let mut params = IoUringParams::default();
        let fd = io_uring_setup(entries, &mut params)?;

        if params.features & IORING_FEAT_SINGLE_MMAP == 0 {
            unsafe {
                libc::close(fd);
            }
            return Err(RingError::MissingSingleMmap);
        }

        let sq_ring_sz = (params.sq_off.array as usize) + (params.sq_entries as usize) * 4;
        let cq_ring_sz =
            (params.cq_off.cqes as usize) + (params.cq_entries as usize) * std::mem::size_of::<IoUringCqe>();
        let ring_sz = sq_ring_sz.max(cq_ring_sz);

        let sq_mmap = match Mmap::new(fd, ring_sz, IORING_OFF_SQ_RING) {
            Ok(m) => m,
            Err(e) => {
                unsafe {
                    libc::close(fd);
                }
                return Err(e);
            }
        };

        let sqes_sz = (params.sq_entries as usize) * std::mem::size_of::<IoUringSqe>();
        let sqes_mmap = match Mmap::new(fd, sqes_sz, IORING_OFF_SQES) {
            Ok(m) => m,
            Err(e) => {
                unsafe {
                    libc::close(fd);
                }
                return Err(e);
            }
        };

        let sq_mask = unsafe { *(sq_mmap.as_ptr().add(params.sq_off.ring_mask as usize) as *const u32) };
        let cq_mask = unsafe { *(sq_mmap.as_ptr().add(params.cq_off.ring_mask as usize) as *const u32) };

        tracing::debug!(fd, entries, "io_uring ring initialized");

        Ok(Ring {
            fd,
            sq_mmap,
            sqes_mmap,
            params,
            sq_mask,
            cq_mask,
            sqe_tail: AtomicU32::new(0),
            submit_lock: Mutex::new(()),
        })
    }

    fn sq_head(&self) -> &AtomicU32 {
        unsafe { atomic_u32_at(self.sq_mmap.as_ptr(), self.params.sq_off.head) }
    }

    fn sq_tail(&self) -> &AtomicU32 {
        unsafe { atomic_u32_at(self.sq_mmap.as_ptr(), self.params.sq_off.tail) }
    }

    fn sq_array(&self) -> *mut u32 {
        unsafe { self.sq_mmap.as_ptr().add(self.params.sq_off.array as usize) as *mut u32 }
    }

    fn cq_head(&self) -> &AtomicU32 {
        unsafe { atomic_u32_at(self.sq_mmap.as_ptr(), self.params.cq_off.head) }
    }

    fn cq_tail(&self) -> &AtomicU32 {
        unsafe { atomic_u32_at(self.sq_mmap.as_ptr(), self.params.cq_off.tail) }
    }

    fn cqes(&self) -> *const IoUringCqe {
        unsafe { self.sq_mmap.as_ptr().add(self.params.cq_off.cqes as usize) as *const IoUringCqe }
    }

    fn sqes(&self) -> *mut IoUringSqe {
        self.sqes_mmap.as_ptr() as *mut IoUringSqe
    }

    /// Reserves the next free SQE slot, returning a mutable reference into
    /// the SQE array. Returns `QueueFull` if the kernel hasn't consumed
    /// enough of the ring since the last submit.
    pub fn get_sqe(&self) -> Result<&mut IoUringSqe, RingError> {
        let head = self.sq_head().load(Ordering::Acquire);
        let tail = self.sqe_tail.load(Ordering::Relaxed);
        if tail.wrapping_sub(head) >= self.params.sq_entries {
            return Err(RingError::QueueFull);
        }
        let idx = tail & self.sq_mask;
        self.sqe_tail.store(tail.wrapping_add(1), Ordering::Relaxed);
        unsafe {
            let sqe = &mut *self.sqes().add(idx as usize);
            *sqe = IoUringSqe::default();
            Ok(sqe)
        }
    }

    /// Publishes every SQE reserved by `get_sqe` since the last submit and
    /// calls `io_uring_enter`. `wait_for` completions are waited on in the
    /// same call when non-zero.
    pub fn submit(&self, wait_for: u32) -> Result<u32, RingError> {
        let _guard = self.submit_lock.lock().unwrap();
        let tail = self.sq_tail().load(Ordering::Relaxed);
        let to_submit = self.sqe_tail.load(Ordering::Relaxed).wrapping_sub(tail);
        if to_submit != 0 {
            let array = self.sq_array();
            for i in 0..to_submit {
                let idx = tail.wrapping_add(i) & self.sq_mask;
                unsafe {
                    ptr::write(array.add(idx as usize), idx);
                }
            }
            self.sq_tail().store(tail.wrapping_add(to_submit), Ordering::Release);
        }

        let flags = if wait_for > 0 { IORING_ENTER_GETEVENTS } else { 0 };
        loop {
            match io_uring_enter(self.fd, to_submit, wait_for, flags) {
                Ok(n) => return Ok(n),
                Err(RingError::Enter(e))
                    if matches!(e.raw_os_error(), Some(libc::EINTR) | Some(libc::EAGAIN)) =>
                {
                    std::thread::yield_now();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns the oldest unconsumed CQE without advancing the ring, if any.
    pub fn peek_cqe(&self) -> Option<IoUringCqe> {
        let head = self.cq_head().load(Ordering::Acquire);
        let tail = self.cq_tail().load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let idx = head & self.cq_mask;
        Some(unsafe { *self.cqes().add(idx as usize) })
    }

    /// Blocks (via `io_uring_enter`) until at least one CQE is available,
    /// then returns it without advancing the ring.
    pub fn wait_cqe(&self) -> Result<IoUringCqe, RingError> {
        loop {
            if let Some(cqe) = self.peek_cqe() {
                return Ok(cqe);
            }
            self.submit(1)?;
        }
    }

    /// Advances the completion queue head past `count` entries.
    pub fn advance_cq(&self, count: u32) {
        let head = self.cq_head().load(Ordering::Relaxed);
        self.cq_head().store(head.wrapping_add(count), Ordering::Release);
    }

    pub fn raw_fd(&self) -> i32 {
        self.fd
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
