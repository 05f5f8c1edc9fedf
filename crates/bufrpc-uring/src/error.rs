use thiserror::Error;

/// Errors surfaced by the ring and event loop (spec §7 "SyscallError" —
/// io_uring enter/setup failures return the raw errno).
#[derive(Debug, Error)]
pub enum RingError {
    #[error("io_uring_setup failed: {0}")]
    Setup(#[source] std::io::Error),

    #[error("kernel does not support IORING_FEAT_SINGLE_MMAP")]
    MissingSingleMmap,

    #[error("mmap failed: {0}")]
    Mmap(#[source] std::io::Error),

    #[error("io_uring_enter failed: {0}")]
    Enter(#[source] std::io::Error),

    #[error("submission queue is full")]
    QueueFull,

    #[error("this platform has no io_uring support")]
    Unsupported,

    #[error("userData referenced in a completion is stale (magic mismatch)")]
    StaleUserData,
}
