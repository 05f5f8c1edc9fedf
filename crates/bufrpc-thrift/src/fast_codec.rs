use crate::error::ThriftError;

/// Hook used by [`FastCodec::fast_write_nocopy`] when a string or binary
/// field exceeds the nocopy threshold: the codec writes the 4-byte length
/// into the destination buffer and delegates the payload to this hook
/// instead of copying it in (spec §4.3).
pub trait NocopyWriter {
    fn write_direct(&mut self, bs: &[u8]);
}

/// Lets a plain `Vec<u8>` act as a nocopy writer by falling back to a
/// normal copy — useful for tests and for callers that do not care about
/// avoiding the copy.
impl NocopyWriter for Vec<u8> {
    fn write_direct(&mut self, bs: &[u8]) {
        self.extend_from_slice(bs);
    }
}

/// Contract between generated RPC message structs and the codec (spec
/// §4.3, §6). The generated code itself is out of scope; only this
/// interface is.
pub trait FastCodec {
    /// Exact encoded length in bytes.
    fn blength(&self) -> usize;

    /// Encodes into `buf` (which must be at least [`FastCodec::blength`]
    /// bytes), using `writer` for any nocopy payload, and returns the
    /// number of bytes written into `buf` itself (payloads delegated to
    /// `writer` are not included).
    fn fast_write_nocopy(&self, buf: &mut [u8], writer: &mut dyn NocopyWriter) -> usize;

    /// Decodes from the front of `buf`, returning the number of bytes
    /// consumed.
    fn fast_read(&mut self, buf: &[u8]) -> Result<usize, ThriftError>;
}

/// Above this many bytes, [`FastCodec`] implementations should route a
/// string/binary field through [`NocopyWriter::write_direct`] instead of
/// copying it into the destination buffer.
pub const NOCOPY_THRESHOLD: usize = 4 * 1024;
