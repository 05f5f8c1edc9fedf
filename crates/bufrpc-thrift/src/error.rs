use thiserror::Error;

/// Error codes carried by [`ThriftError::InvalidData`] (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidDataCode {
    UnknownProtocolException,
    InvalidData,
    NegativeSize,
    SizeLimit,
    BadVersion,
    NotImplemented,
    DepthLimit,
}

/// Error taxonomy shared by [`crate::BinaryProtocol`], the skip decoders, and
/// the FastCodec machinery.
#[derive(Debug, Error)]
pub enum ThriftError {
    #[error("invalid thrift data ({code:?}): {message}")]
    InvalidData { code: InvalidDataCode, message: String },

    #[error("short buffer: needed {needed} bytes, had {available}")]
    ShortBuffer { needed: usize, available: usize },

    #[error("underlying stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("recursion depth limit ({0}) exceeded while skipping a value")]
    DepthLimit(u32),

    #[error(transparent)]
    Bufio(#[from] bufrpc_bufio::BufioError),
}

impl ThriftError {
    pub fn invalid_data(code: InvalidDataCode, message: impl Into<String>) -> Self {
        Self::InvalidData { code, message: message.into() }
    }
}
