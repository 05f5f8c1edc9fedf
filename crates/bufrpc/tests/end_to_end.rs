use std::io::Cursor;

use bufrpc::{adapt_read, adapt_write, EncodeParam, FastCodec, MessageType, NocopyWriter, ProtocolId, Reader, ThriftError, Writer};

struct Echo {
    value: i32,
}

impl FastCodec for Echo {
    fn blength(&self) -> usize {
        4
    }
    fn fast_write_nocopy(&self, buf: &mut [u8], _writer: &mut dyn NocopyWriter) -> usize {
        bufrpc::BinaryProtocol::write_i32(buf, self.value).unwrap()
    }
    fn fast_read(&mut self, buf: &[u8]) -> Result<usize, ThriftError> {
        let (v, n) = bufrpc::BinaryProtocol::read_i32(buf)?;
        self.value = v;
        Ok(n)
    }
}

#[test]
fn adapt_write_then_adapt_read_round_trips_through_ttheader() {
    let header = EncodeParam {
        flags: 0,
        seq_id: 7,
        protocol_id: Some(ProtocolId::ThriftBinary),
        transform_ids: vec![],
        int_info: Default::default(),
        str_info: Default::default(),
    };

    let mut sink = Vec::new();
    {
        let writer = Writer::new(&mut sink);
        let msg = Echo { value: 99 };
        adapt_write(&writer, &header, "ping", MessageType::Call, 7, &msg).unwrap();
        writer.flush().unwrap();
    }

    let reader = Reader::new(Cursor::new(sink));
    let mut decoded = Echo { value: 0 };
    let frame = adapt_read(&mut decoded, &reader).unwrap();

    assert_eq!(frame.name, "ping");
    assert_eq!(frame.seq_id, 7);
    assert_eq!(frame.header.seq_id, 7);
    assert_eq!(decoded.value, 99);
}
