//! Thin wrappers over the io_uring syscalls this crate actually drives
//! (`io_uring_setup`, `io_uring_enter`). The kernel exposes no libc
//! wrapper for these, so we go through `libc::syscall` directly (spec
//! §6: "the ring talks to the kernel through the io_uring syscalls
//! directly; no io_uring userspace library is used").
use std::io;
use std::os::raw::c_void;

use crate::abi::IoUringParams;
use crate::error::RingError;

/// `io_uring_setup(entries, params) -> fd`.
pub fn io_uring_setup(entries: u32, params: &mut IoUringParams) -> Result<i32, RingError> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_io_uring_setup,
            entries as libc::c_long,
            params as *mut IoUringParams as *mut c_void,
        )
    };
    if ret < 0 {
        return Err(RingError::Setup(io::Error::last_os_error()));
    }
    Ok(ret as i32)
}

/// `io_uring_enter(fd, to_submit, min_complete, flags, sig, sigsz) -> submitted`.
pub fn io_uring_enter(fd: i32, to_submit: u32, min_complete: u32, flags: u32) -> Result<u32, RingError> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_io_uring_enter,
            fd as libc::c_long,
            to_submit as libc::c_long,
            min_complete as libc::c_long,
            flags as libc::c_long,
            std::ptr::null::<c_void>(),
            0 as libc::c_long,
        )
    };
    if ret < 0 {
        return Err(RingError::Enter(io::Error::last_os_error()));
    }
    Ok(ret as u32)
}
