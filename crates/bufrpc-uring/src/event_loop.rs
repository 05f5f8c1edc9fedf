//! The event loop: one feeder thread turns `Request`s into SQEs and
//! calls `submit` in batches, one completion thread drains CQEs and
//! dispatches results back to callers (spec §4.5 — "goroutines and
//! channels" translated to OS threads and `mpsc`, since this crate is
//! explicitly not a general-purpose async runtime).
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};

use crate::error::RingError;
use crate::ring::Ring;
use crate::user_data::UserData;

/// A read or write request submitted to the loop, plus where to deliver
/// its result.
pub enum Request {
    Read {
        fd: i32,
        bufs: Vec<BytesMut>,
        reply: mpsc::Sender<io::Result<(usize, Vec<BytesMut>)>>,
    },
    Write {
        fd: i32,
        bufs: Vec<Bytes>,
        reply: mpsc::Sender<io::Result<usize>>,
    },
}

/// What the feeder thread's single queue actually carries: either a fresh
/// caller request, or a partially-completed op the completion thread is
/// handing back for re-submission. `Ring::get_sqe` reserves a slot with a
/// plain (non-atomic) read-modify-write and is only safe called from one
/// thread (spec §5: "submit path is serialized") — routing re-submission
/// through this same channel, instead of calling `get_sqe` directly from
/// the completion thread, is what keeps that true.
enum FeedItem {
    New(Request),
    Requeue(Box<UserData>),
}

/// How many queued requests (or how long since the last one) trigger an
/// `io_uring_enter` submit call.
pub struct BatchConfig {
    pub max_batch: usize,
    pub max_delay: Duration,
}

impl BatchConfig {
    #[must_use]
    pub const fn new(max_batch: usize, max_delay: Duration) -> Self {
        assert!(max_batch > 0, "max_batch must be non-zero");
        Self { max_batch, max_delay }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(32, Duration::from_micros(200))
    }
}

pub struct EventLoop {
    request_tx: mpsc::Sender<FeedItem>,
    feeder: Option<JoinHandle<()>>,
    completions: Option<JoinHandle<()>>,
}

impl EventLoop {
    pub fn start(entries: u32, batch: BatchConfig) -> Result<Self, RingError> {
        let ring = Arc::new(Ring::new(entries)?);
        let (request_tx, request_rx) = mpsc::channel::<FeedItem>();

        let feeder_ring = Arc::clone(&ring);
        let feeder = std::thread::Builder::new()
            .name("bufrpc-uring-feeder".into())
            .spawn(move || feeder_loop(&feeder_ring, &request_rx, &batch))
            .expect("spawn feeder thread");

        let completion_ring = Arc::clone(&ring);
        let requeue_tx = request_tx.clone();
        let completions = std::thread::Builder::new()
            .name("bufrpc-uring-completions".into())
            .spawn(move || completion_loop(&completion_ring, &requeue_tx))
            .expect("spawn completion thread");

        Ok(EventLoop {
            request_tx,
            feeder: Some(feeder),
            completions: Some(completions),
        })
    }

    pub fn submit_read(&self, fd: i32, bufs: Vec<BytesMut>) -> mpsc::Receiver<io::Result<(usize, Vec<BytesMut>)>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let _ = self.request_tx.send(FeedItem::New(Request::Read { fd, bufs, reply: reply_tx }));
        reply_rx
    }

    pub fn submit_write(&self, fd: i32, bufs: Vec<Bytes>) -> mpsc::Receiver<io::Result<usize>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let _ = self.request_tx.send(FeedItem::New(Request::Write { fd, bufs, reply: reply_tx }));
        reply_rx
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Dropping request_tx (when this is the last clone) unblocks the
        // feeder's recv loop; the completion thread exits once wait_cqe
        // starts erroring on the closed ring fd.
        if let Some(h) = self.feeder.take() {
            let _ = h.join();
        }
        if let Some(h) = self.completions.take() {
            let _ = h.join();
        }
    }
}

fn feeder_loop(ring: &Ring, request_rx: &mpsc::Receiver<FeedItem>, batch: &BatchConfig) {
    loop {
        let mut queued = 0usize;
        let deadline = Instant::now() + batch.max_delay;
        loop {
            let item = if queued == 0 {
                match request_rx.recv() {
                    Ok(r) => r,
                    Err(_) => return,
                }
            } else {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match request_rx.recv_timeout(remaining) {
                    Ok(r) => r,
                    Err(_) => break,
                }
            };

            let ud = match item {
                FeedItem::New(Request::Read { fd, bufs, reply }) => UserData::new_read(fd, bufs, reply),
                FeedItem::New(Request::Write { fd, bufs, reply }) => UserData::new_write(fd, bufs, reply),
                FeedItem::Requeue(ud) => ud,
            };

            match ring.get_sqe() {
                Ok(sqe) => {
                    let _ = ud.submit_into(sqe);
                    queued += 1;
                }
                Err(RingError::QueueFull) => {
                    let _ = ring.submit(0);
                    queued = 0;
                }
                Err(_) => return,
            }

            if queued >= batch.max_batch {
                break;
            }
        }
        if queued > 0 {
            let _ = ring.submit(0);
        }
    }
}

fn completion_loop(ring: &Ring, requeue_tx: &mpsc::Sender<FeedItem>) {
    loop {
        let cqe = match ring.wait_cqe() {
            Ok(cqe) => cqe,
            Err(_) => return,
        };
        ring.advance_cq(1);

        if cqe.user_data == 0 {
            // timeout or cancellation completion carrying no operation
            continue;
        }

        let mut ud = match unsafe { UserData::reclaim(cqe.user_data) } {
            Ok(ud) => ud,
            Err(_) => continue,
        };

        if cqe.res < 0 {
            ud.finish(Err(io::Error::from_raw_os_error(-cqe.res)));
            continue;
        }

        let n = cqe.res as usize;
        let done = ud.advance(n);
        if done || n == 0 {
            ud.finish(Ok(ud.transferred));
            continue;
        }

        // partial readv/writev: hand the trimmed iovec list back to the
        // feeder thread instead of calling `ring.get_sqe()` here — slot
        // reservation is only safe from the single thread that owns it.
        if let Err(mpsc::SendError(item)) = requeue_tx.send(FeedItem::Requeue(ud)) {
            if let FeedItem::Requeue(ud) = item {
                ud.finish(Ok(ud.transferred));
            }
        }
    }
}
