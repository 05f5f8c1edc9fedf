use crate::application_exception::ApplicationException;
use crate::binary::BinaryProtocol;
use crate::element::MessageType;
use crate::error::ThriftError;
use crate::fast_codec::FastCodec;

/// Allocates exactly `MessageBeginLength(name) + msg.blength()` bytes,
/// writes the message header, then calls `fast_write_nocopy` into the
/// remainder (spec §4.3). The nocopy writer falls back to a plain copy,
/// since a flat `Vec<u8>` result has nowhere else to route a direct
/// append to.
pub fn marshal_fast_msg(
    name: &str,
    msg_type: MessageType,
    seq_id: i32,
    msg: &dyn FastCodec,
) -> Result<Vec<u8>, ThriftError> {
    let header_len = BinaryProtocol::message_begin_length(name);
    let mut buf = vec![0u8; header_len + msg.blength()];
    BinaryProtocol::write_message_begin(&mut buf[..header_len], name, msg_type, seq_id)?;
    let mut sink = Vec::new();
    msg.fast_write_nocopy(&mut buf[header_len..], &mut sink);
    if !sink.is_empty() {
        buf.extend_from_slice(&sink);
    }
    Ok(buf)
}

/// Result of [`unmarshal_fast_msg`]: either the caller's message was
/// decoded in place, or the wire carried an [`ApplicationException`]
/// (message type `EXCEPTION`) instead.
pub enum UnmarshalOutcome {
    Ok { name: String, seq_id: i32 },
    Exception { name: String, seq_id: i32, exception: ApplicationException },
}

/// Reads the message header; if the message type is `EXCEPTION`, decodes
/// an [`ApplicationException`] and returns it instead of calling
/// `fast_read` on the caller's struct (spec §4.3).
pub fn unmarshal_fast_msg(
    buf: &[u8],
    msg: &mut dyn FastCodec,
) -> Result<UnmarshalOutcome, ThriftError> {
    let (name, msg_type, seq_id, consumed) = BinaryProtocol::read_message_begin(buf)?;
    let body = &buf[consumed..];
    if msg_type == MessageType::Exception {
        let mut exception = ApplicationException::new(0, "");
        exception.fast_read(body)?;
        return Ok(UnmarshalOutcome::Exception { name, seq_id, exception });
    }
    msg.fast_read(body)?;
    Ok(UnmarshalOutcome::Ok { name, seq_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_codec::NocopyWriter;

    struct Echo {
        value: i32,
    }

    impl FastCodec for Echo {
        fn blength(&self) -> usize {
            4
        }
        fn fast_write_nocopy(&self, buf: &mut [u8], _writer: &mut dyn NocopyWriter) -> usize {
            BinaryProtocol::write_i32(buf, self.value).unwrap()
        }
        fn fast_read(&mut self, buf: &[u8]) -> Result<usize, ThriftError> {
            let (v, n) = BinaryProtocol::read_i32(buf)?;
            self.value = v;
            Ok(n)
        }
    }

    #[test]
    fn marshal_unmarshal_round_trips_ok_message() {
        let msg = Echo { value: 42 };
        let bytes = marshal_fast_msg("ping", MessageType::Call, 1, &msg).unwrap();

        let mut decoded = Echo { value: 0 };
        match unmarshal_fast_msg(&bytes, &mut decoded).unwrap() {
            UnmarshalOutcome::Ok { name, seq_id } => {
                assert_eq!(name, "ping");
                assert_eq!(seq_id, 1);
                assert_eq!(decoded.value, 42);
            }
            UnmarshalOutcome::Exception { .. } => panic!("expected Ok outcome"),
        }
    }

    #[test]
    fn unmarshal_routes_exception_message_type() {
        let exc = ApplicationException::new(crate::application_exception::INTERNAL_ERROR, "boom");
        let bytes = marshal_fast_msg("ping", MessageType::Exception, 2, &exc).unwrap();

        let mut decoded = Echo { value: 0 };
        match unmarshal_fast_msg(&bytes, &mut decoded).unwrap() {
            UnmarshalOutcome::Exception { exception, .. } => {
                assert_eq!(exception.msg(), "boom");
            }
            UnmarshalOutcome::Ok { .. } => panic!("expected Exception outcome"),
        }
    }
}
