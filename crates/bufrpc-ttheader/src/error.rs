use thiserror::Error;

#[derive(Debug, Error)]
pub enum TTHeaderError {
    #[error("short buffer: needed {needed} bytes, had {available}")]
    ShortBuffer { needed: usize, available: usize },

    #[error("bad magic {0:#06x}, expected 0x1000")]
    BadMagic(u16),

    #[error("header-info size in words ({0}) out of range [2, 65535]")]
    HeaderInfoSizeOutOfRange(usize),

    #[error("unsupported protocol id {0:#04x}")]
    UnsupportedProtocolId(u8),

    #[error("unknown info section id {0:#04x}")]
    UnknownInfoId(u8),

    #[error("total length field ({total}) smaller than header overhead ({overhead})")]
    TotalLengthUnderflow { total: u32, overhead: usize },

    #[error("header length ({len}) exceeds configured cap ({cap})")]
    HeaderTooLarge { len: usize, cap: usize },

    #[error(transparent)]
    Bufio(#[from] bufrpc_bufio::BufioError),
}
