//! `UserData`: the per-operation context attached to an SQE via its
//! `user_data` field and recovered from the matching CQE (spec §4.5
//! "the completion carries only an opaque u64; the event loop must be
//! able to recover the operation, its buffers, and how much of it has
//! already completed from that one value alone").
//!
//! The SQE's `user_data` is the raw address of a heap-allocated
//! `UserData`, boxed and leaked on submission, reclaimed with
//! `Box::from_raw` on completion. `magic` guards against a completion
//! whose `user_data` doesn't actually point at one of our allocations.
use std::io;
use std::sync::mpsc;

use bytes::{Bytes, BytesMut};

use crate::abi::{IoUringSqe, IORING_OP_READV, IORING_OP_WRITEV};
use crate::error::RingError;

const MAGIC: u64 = 0x5553_4552_4441_5441; // "USERDATA" in ascii, just a recognizable sentinel

enum Op {
    Read,
    Write,
}

/// Where a finished operation's result is delivered. Read and write
/// callers expect different payloads (a read hands back its filled
/// buffers, a write just a byte count), so this carries the sender that
/// matches the operation `UserData` was built for.
pub enum Reply {
    Read(mpsc::Sender<io::Result<(usize, Vec<BytesMut>)>>),
    Write(mpsc::Sender<io::Result<usize>>),
}

/// Context for one in-flight readv/writev operation, including enough
/// state to re-submit the unfinished tail after a partial completion.
pub struct UserData {
    magic: u64,
    op: Op,
    fd: i32,
    iovecs: Vec<libc::iovec>,
    read_bufs: Vec<BytesMut>,
    write_bufs: Vec<Bytes>,
    pub transferred: usize,
    pub total: usize,
    reply: Option<Reply>,
}

unsafe impl Send for UserData {}

impl UserData {
    pub fn new_read(fd: i32, bufs: Vec<BytesMut>, reply: mpsc::Sender<io::Result<(usize, Vec<BytesMut>)>>) -> Box<Self> {
        let total = bufs.iter().map(|b| b.capacity()).sum();
        let mut ud = Box::new(UserData {
            magic: MAGIC,
            op: Op::Read,
            fd,
            iovecs: Vec::with_capacity(bufs.len()),
            read_bufs: bufs,
            write_bufs: Vec::new(),
            transferred: 0,
            total,
            reply: Some(Reply::Read(reply)),
        });
        ud.rebuild_iovecs();
        ud
    }

    pub fn new_write(fd: i32, bufs: Vec<Bytes>, reply: mpsc::Sender<io::Result<usize>>) -> Box<Self> {
        let total = bufs.iter().map(|b| b.len()).sum();
        let mut ud = Box::new(UserData {
            magic: MAGIC,
            op: Op::Write,
            fd,
            iovecs: Vec::with_capacity(bufs.len()),
            read_bufs: Vec::new(),
            write_bufs: bufs,
            transferred: 0,
            total,
            reply: Some(Reply::Write(reply)),
        });
        ud.rebuild_iovecs();
        ud
    }

    fn rebuild_iovecs(&mut self) {
        self.iovecs.clear();
        match self.op {
            Op::Read => {
                for buf in &mut self.read_bufs {
                    let spare = buf.spare_capacity_mut();
                    self.iovecs.push(libc::iovec {
                        iov_base: spare.as_mut_ptr() as *mut libc::c_void,
                        iov_len: spare.len(),
                    });
                }
            }
            Op::Write => {
                for buf in &self.write_bufs {
                    self.iovecs.push(libc::iovec {
                        iov_base: buf.as_ptr() as *mut libc::c_void,
                        iov_len: buf.len(),
                    });
                }
            }
        }
    }

    /// Writes this operation into `sqe`, leaking `self` as the SQE's
    /// `user_data`. The returned raw pointer is owned by the kernel until
    /// `UserData::reclaim` is called on the matching CQE.
    pub fn submit_into(self: Box<Self>, sqe: &mut IoUringSqe) -> u64 {
        let opcode = match self.op {
            Op::Read => IORING_OP_READV,
            Op::Write => IORING_OP_WRITEV,
        };
        sqe.opcode = opcode;
        sqe.fd = self.fd;
        sqe.addr = self.iovecs.as_ptr() as u64;
        sqe.len = self.iovecs.len() as u32;
        sqe.off = self.transferred as u64;

        let ptr = Box::into_raw(self);
        let user_data = ptr as u64;
        sqe.user_data = user_data;
        user_data
    }

    /// Recovers ownership of a `UserData` from a CQE's `user_data` field.
    ///
    /// # Safety
    /// `user_data` must be a value previously returned by
    /// [`UserData::submit_into`] on this process, not yet reclaimed.
    pub unsafe fn reclaim(user_data: u64) -> Result<Box<Self>, RingError> {
        let ptr = user_data as *mut UserData;
        let ud = Box::from_raw(ptr);
        if ud.magic != MAGIC {
            return Err(RingError::StaleUserData);
        }
        Ok(ud)
    }

    /// Trims `n` completed bytes off the front of the iovec list in place,
    /// advancing `transferred`. Returns `true` once the whole operation has
    /// completed.
    pub fn advance(&mut self, n: usize) -> bool {
        self.transferred += n;
        let mut remaining = n;
        while remaining > 0 {
            let first = match self.iovecs.first_mut() {
                Some(iov) => iov,
                None => break,
            };
            if remaining < first.iov_len {
                first.iov_base = unsafe { first.iov_base.add(remaining) };
                first.iov_len -= remaining;
                remaining = 0;
            } else {
                remaining -= first.iov_len;
                self.iovecs.remove(0);
            }
        }
        self.transferred >= self.total
    }

    pub fn iovecs_empty(&self) -> bool {
        self.iovecs.is_empty()
    }

    /// Consumes `self`, delivering the final result to whoever is awaiting
    /// this operation through the reply channel it was built with.
    pub fn finish(mut self: Box<Self>, result: io::Result<usize>) {
        let reply = self.reply.take();
        match (reply, matches!(self.op, Op::Read)) {
            (Some(Reply::Read(tx)), true) => {
                let result = result.map(|n| {
                    let mut remaining = n;
                    for buf in &mut self.read_bufs {
                        let len = buf.capacity().min(remaining);
                        remaining -= len;
                        unsafe {
                            buf.set_len(len);
                        }
                    }
                    (n, std::mem::take(&mut self.read_bufs))
                });
                let _ = tx.send(result);
            }
            (Some(Reply::Write(tx)), false) => {
                let _ = tx.send(result);
            }
            _ => {}
        }
    }
}
