//! Facade crate tying the four core subsystems together: `bufiox`
//! buffered I/O, the Thrift binary codec, TTHeader framing, and the
//! io_uring event loop (spec §1–§2). Most callers only need this crate;
//! the `bufrpc-*` crates are usable standalone for embedders that want
//! just one layer.

mod adapt;
mod error;

pub use adapt::{adapt_read, adapt_write, ReadFrame};
pub use error::Error;

pub use bufrpc_alloc::{AllocError, BitmapAllocator, Block, BlockAllocator, BuddyAllocator, HeapAllocator};
pub use bufrpc_bufio::{BufioError, Reader, ReaderConfig, Writer, WriterConfig};
pub use bufrpc_thrift::{
    arena_copy_count, marshal_fast_msg, set_span_cache, skip, skip_with_config, span_cache_enabled,
    unmarshal_fast_msg, ApplicationException, BinaryProtocol, BufferReader, BufferWriter, BufioSkipDecoder,
    ElementType, ExceptionKind, FastCodec, IoSkipDecoder, MessageType, NocopyWriter, SkipConfig, SliceSkipDecoder,
    ThriftError, UnmarshalOutcome,
};
pub use bufrpc_ttheader::{
    decode as decode_ttheader, decode_with_config as decode_ttheader_with_config, encode as encode_ttheader,
    DecodedHeader, EncodeParam, HeaderConfig, ProtocolId,
};

#[cfg(target_os = "linux")]
pub use bufrpc_uring::{BatchConfig, EventLoop, Ring};
pub use bufrpc_uring::RingError;
