//! Tunables for [`crate::Reader`]/[`crate::Writer`]. Defaults match the
//! values spec.md states directly (100 empty-read attempts, 4 KiB
//! direct-read threshold, 4 KiB starting chunk size).

/// Construction-time settings for [`crate::Reader`].
#[derive(Debug, Clone, Copy)]
pub struct ReaderConfig {
    pub initial_buf_size: usize,
    pub direct_read_threshold: usize,
    pub max_consecutive_empty_reads: u32,
}

impl ReaderConfig {
    #[must_use]
    pub const fn new(initial_buf_size: usize, direct_read_threshold: usize, max_consecutive_empty_reads: u32) -> Self {
        assert!(initial_buf_size > 0, "initial_buf_size must be non-zero");
        assert!(max_consecutive_empty_reads > 0, "max_consecutive_empty_reads must be non-zero");
        Self { initial_buf_size, direct_read_threshold, max_consecutive_empty_reads }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new(crate::reader::DEFAULT_BUF_SIZE, crate::reader::DIRECT_READ_THRESHOLD, crate::reader::MAX_CONSECUTIVE_EMPTY_READS)
    }
}

/// Construction-time settings for [`crate::Writer`].
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    pub initial_chunk_size: usize,
}

impl WriterConfig {
    #[must_use]
    pub const fn new(initial_chunk_size: usize) -> Self {
        assert!(initial_chunk_size > 0, "initial_chunk_size must be non-zero");
        Self { initial_chunk_size }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::new(crate::reader::DEFAULT_BUF_SIZE)
    }
}
