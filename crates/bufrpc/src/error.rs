use thiserror::Error;

/// Umbrella error for the facade: wraps whichever layer's error actually
/// fired. Callers who only use one sub-crate directly can keep matching
/// on that crate's own error type; this is only surfaced by the
/// facade-level `marshal`/`unmarshal`/`adapt_*` functions.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bufio(#[from] bufrpc_bufio::BufioError),

    #[error(transparent)]
    Thrift(#[from] bufrpc_thrift::ThriftError),

    #[error(transparent)]
    TTHeader(#[from] bufrpc_ttheader::TTHeaderError),

    #[error(transparent)]
    Ring(#[from] bufrpc_uring::RingError),

    /// The peer replied with an `ApplicationException` instead of the
    /// expected message body.
    #[error(transparent)]
    Remote(#[from] bufrpc_thrift::ApplicationException),
}
