//! Zero-copy buffered I/O ("bufiox") for framed RPC protocols.
//!
//! [`Reader`] and [`Writer`] hand out borrowed windows into internally
//! owned chunks instead of copying into caller-supplied buffers. Growth
//! defers rather than reallocates: an outstanding window stays valid
//! until the owning chunk is released, because growth moves the old
//! chunk onto a side list instead of freeing or overwriting it.
//!
//! [`bytes_io`] provides non-buffered, in-memory counterparts for callers
//! that already hold a complete payload (e.g. after TTHeader framing).

mod bytes_io;
mod config;
mod error;
mod histogram;
mod reader;
mod writer;

pub use bytes_io::{BytesReader, BytesWriter};
pub use config::{ReaderConfig, WriterConfig};
pub use error::BufioError;
pub use reader::{PeekResult, Reader, DEFAULT_BUF_SIZE, DIRECT_READ_THRESHOLD, MAX_CONSECUTIVE_EMPTY_READS};
pub use writer::Writer;
