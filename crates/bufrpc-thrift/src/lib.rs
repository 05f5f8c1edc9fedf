//! Thrift binary wire protocol: stateless element encode/decode, a
//! recursion-bounded `Skip`, three `SkipDecoder` variants that return the
//! exact byte image of a skipped value, pooled stateful wrappers over
//! `bufrpc_bufio`, and the `FastCodec` contract used by generated RPC
//! message structs.

mod application_exception;
mod binary;
mod buffer;
mod element;
mod error;
mod fast_codec;
mod fast_marshal;
mod pool;
mod skip;
mod skip_decoder;
mod span_cache;

pub use application_exception::{ApplicationException, ExceptionKind};
pub use binary::BinaryProtocol;
pub use buffer::{BufferReader, BufferWriter};
pub use element::{ElementType, MessageType, VERSION_1, VERSION_MASK};
pub use error::{InvalidDataCode, ThriftError};
pub use fast_codec::{FastCodec, NocopyWriter, NOCOPY_THRESHOLD};
pub use fast_marshal::{marshal_fast_msg, unmarshal_fast_msg, UnmarshalOutcome};
pub use pool::Pool;
pub use skip::{skip, skip_with_config, SkipConfig, DEFAULT_MAX_DEPTH};
pub use skip_decoder::{BufioSkipDecoder, IoSkipDecoder, SliceSkipDecoder};
pub use span_cache::{arena_copy_count, set_span_cache, span_cache_enabled};
