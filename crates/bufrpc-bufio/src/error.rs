use thiserror::Error;

/// Errors surfaced by [`crate::Reader`] and [`crate::Writer`] (spec §7).
#[derive(Debug, Error)]
pub enum BufioError {
    /// A negative or otherwise invalid length was requested.
    #[error("invalid length {0}")]
    InvalidLength(isize),
    /// The underlying source/sink returned an I/O error.
    #[error("underlying stream error: {0}")]
    Io(#[from] std::io::Error),
    /// `maxConsecutiveEmptyReads` (100) was exceeded while trying to fill
    /// the buffer — the source is stalled without signaling EOF or error.
    #[error("no progress after {0} consecutive empty reads")]
    NoProgress(u32),
    /// A prior operation on this Reader/Writer already failed; the sticky
    /// error is returned again without retrying (spec §7 propagation
    /// policy).
    #[error("stream is closed after a prior error: {0}")]
    Sticky(String),
}

impl Clone for BufioError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidLength(n) => Self::InvalidLength(*n),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::NoProgress(n) => Self::NoProgress(*n),
            Self::Sticky(s) => Self::Sticky(s.clone()),
        }
    }
}
