//! Exercises the event loop against a real socketpair. Ignored outside a
//! Linux kernel with io_uring support.
#![cfg(target_os = "linux")]

use std::io::Read;
use std::os::fd::{FromRawFd, IntoRawFd};
use std::os::unix::net::UnixStream;

use bufrpc_uring::{BatchConfig, EventLoop};
use bytes::Bytes;

#[test]
#[ignore = "requires a Linux kernel with io_uring support"]
fn write_completes_with_full_length() {
    let (a, mut b) = UnixStream::pair().unwrap();
    let fd = a.into_raw_fd();

    let event_loop = EventLoop::start(8, BatchConfig::default()).unwrap();
    let rx = event_loop.submit_write(fd, vec![Bytes::from_static(b"hello io_uring")]);

    let mut out = [0u8; 14];
    b.read_exact(&mut out).unwrap();

    let n = rx.recv().unwrap().unwrap();
    assert_eq!(n, 14);
    assert_eq!(&out, b"hello io_uring");

    unsafe {
        std::fs::File::from_raw_fd(fd);
    }
}
