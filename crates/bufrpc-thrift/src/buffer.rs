use std::io::{Read, Write};

use bufrpc_bufio::{Reader as BufioReader, Writer as BufioWriter};

use crate::binary::BinaryProtocol;
use crate::element::MessageType;
use crate::error::ThriftError;

/// Stateful encoder layered over a [`bufrpc_bufio::Writer`], allocating a
/// `Malloc` window per element (spec §4.3). Detached from any particular
/// sink via [`BufferWriter::recycle`] so the wrapper itself can live in a
/// [`crate::Pool`].
pub struct BufferWriter<W> {
    inner: Option<BufioWriter<W>>,
}

impl<W: Write> BufferWriter<W> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub fn attach(&mut self, writer: BufioWriter<W>) {
        self.inner = Some(writer);
    }

    fn writer(&self) -> &BufioWriter<W> {
        self.inner.as_ref().expect("BufferWriter used before attach()")
    }

    pub fn write_message_begin(
        &self,
        name: &str,
        msg_type: MessageType,
        seq_id: i32,
    ) -> Result<(), ThriftError> {
        let n = BinaryProtocol::message_begin_length(name);
        let buf = self.writer().malloc(n)?;
        BinaryProtocol::write_message_begin(buf, name, msg_type, seq_id)?;
        Ok(())
    }

    pub fn write_i32(&self, v: i32) -> Result<(), ThriftError> {
        let buf = self.writer().malloc(4)?;
        BinaryProtocol::write_i32(buf, v)?;
        Ok(())
    }

    pub fn write_string(&self, s: &str) -> Result<(), ThriftError> {
        let buf = self.writer().malloc(4 + s.len())?;
        BinaryProtocol::write_string(buf, s)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), ThriftError> {
        Ok(self.writer().flush()?)
    }

    /// Detaches the underlying writer, clearing this wrapper for reuse
    /// from a [`crate::Pool`].
    pub fn recycle(&mut self) -> Option<BufioWriter<W>> {
        self.inner.take()
    }
}

impl<W: Write> Default for BufferWriter<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful decoder layered over a [`bufrpc_bufio::Reader`], allocating via
/// `Next` for each element (spec §4.3).
pub struct BufferReader<R> {
    inner: Option<BufioReader<R>>,
}

impl<R: Read> BufferReader<R> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub fn attach(&mut self, reader: BufioReader<R>) {
        self.inner = Some(reader);
    }

    fn reader(&self) -> &BufioReader<R> {
        self.inner.as_ref().expect("BufferReader used before attach()")
    }

    pub fn read_message_begin(&self) -> Result<(String, MessageType, i32), ThriftError> {
        // Message headers are variable length (the name), so peek a
        // generous window first and trust `read_message_begin` to report
        // exactly how much it consumed.
        let probe = self.reader().peek(256);
        let (name, msg_type, seq_id, consumed) = BinaryProtocol::read_message_begin(probe.bytes)
            .or_else(|_| {
                probe.err.clone().map_or_else(
                    || Err(ThriftError::invalid_data(
                        crate::error::InvalidDataCode::InvalidData,
                        "truncated message header",
                    )),
                    |e| Err(ThriftError::Bufio(e)),
                )
            })?;
        self.reader().skip(consumed)?;
        Ok((name, msg_type, seq_id))
    }

    pub fn read_i32(&self) -> Result<i32, ThriftError> {
        let window = self.reader().next(4)?;
        Ok(BinaryProtocol::read_i32(window)?.0)
    }

    #[must_use]
    pub fn recycle(&mut self) -> Option<BufioReader<R>> {
        self.inner.take()
    }
}

impl<R: Read> Default for BufferReader<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writer_then_reader_round_trips_message_begin() {
        let mut sink = Vec::new();
        {
            let mut bw: BufferWriter<&mut Vec<u8>> = BufferWriter::new();
            bw.attach(BufioWriter::new(&mut sink));
            bw.write_message_begin("echo", MessageType::Call, 9).unwrap();
            bw.flush().unwrap();
        }

        let mut br: BufferReader<Cursor<Vec<u8>>> = BufferReader::new();
        br.attach(BufioReader::new(Cursor::new(sink)));
        let (name, ty, seq) = br.read_message_begin().unwrap();
        assert_eq!(name, "echo");
        assert_eq!(ty, MessageType::Call);
        assert_eq!(seq, 9);
    }

    #[test]
    fn recycle_detaches_underlying_writer() {
        let mut bw: BufferWriter<Vec<u8>> = BufferWriter::new();
        bw.attach(BufioWriter::new(Vec::new()));
        assert!(bw.recycle().is_some());
        assert!(bw.recycle().is_none());
    }
}
