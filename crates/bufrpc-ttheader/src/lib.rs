//! TTHeader: a length-prefixed, self-describing record that frames every
//! RPC message with flags, a sequence id, a protocol id, and KV/IntKV/ACL
//! info sections, encoded and decoded through `bufrpc_bufio` (spec §4.4).

mod error;
mod header;
mod protocol;

pub use error::TTHeaderError;
pub use header::{
    decode, decode_with_config, encode, DecodedHeader, EncodeParam, HeaderConfig, PendingHeader, ACL_TOKEN_KEY,
    DEFAULT_MAX_HEADER_LEN, MAGIC,
};
pub use protocol::ProtocolId;
