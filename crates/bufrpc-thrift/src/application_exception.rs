use std::fmt;

use crate::binary::BinaryProtocol;
use crate::element::ElementType;
use crate::error::ThriftError;
use crate::fast_codec::{FastCodec, NocopyWriter};

fn need(buf_len: usize, needed: usize) -> Result<(), ThriftError> {
    if buf_len < needed {
        return Err(ThriftError::ShortBuffer { needed, available: buf_len });
    }
    Ok(())
}

pub const UNKNOWN: i32 = 0;
pub const UNKNOWN_METHOD: i32 = 1;
pub const INVALID_MESSAGE_TYPE: i32 = 2;
pub const WRONG_METHOD_NAME: i32 = 3;
pub const BAD_SEQUENCE_ID: i32 = 4;
pub const MISSING_RESULT: i32 = 5;
pub const INTERNAL_ERROR: i32 = 6;
pub const PROTOCOL_ERROR: i32 = 7;
pub const INVALID_TRANSFORM: i32 = 8;
pub const INVALID_PROTOCOL: i32 = 9;
pub const UNSUPPORTED_CLIENT_TYPE: i32 = 10;

/// Distinguishes the error chain `prepend_error` is annotating, mirroring
/// the transport/protocol/application/generic split upstream exception
/// hierarchies draw (spec §7 "PrependError").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    Transport,
    Protocol,
    Application,
    Generic,
}

/// Out-of-band RPC error, carried on the wire as a three-field Thrift
/// struct (spec §4.3): `message` (field 1), `type` (field 2), STOP.
#[derive(Debug, Clone)]
pub struct ApplicationException {
    message: String,
    type_id: i32,
    kind: ExceptionKind,
}

impl ApplicationException {
    #[must_use]
    pub fn new(type_id: i32, message: impl Into<String>) -> Self {
        Self { message: message.into(), type_id, kind: ExceptionKind::Application }
    }

    #[must_use]
    pub fn with_kind(type_id: i32, message: impl Into<String>, kind: ExceptionKind) -> Self {
        Self { message: message.into(), type_id, kind }
    }

    #[must_use]
    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    #[must_use]
    pub fn msg(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    fn canonical_message(type_id: i32) -> Option<&'static str> {
        Some(match type_id {
            UNKNOWN_METHOD => "unknown method",
            WRONG_METHOD_NAME => "wrong method name",
            BAD_SEQUENCE_ID => "bad sequence id",
            MISSING_RESULT => "missing result",
            INTERNAL_ERROR => "internal error",
            PROTOCOL_ERROR => "protocol error",
            INVALID_TRANSFORM => "invalid transform",
            INVALID_PROTOCOL => "invalid protocol",
            UNSUPPORTED_CLIENT_TYPE => "unsupported client type",
            _ => return None,
        })
    }

    /// The stored message if non-empty, else a canonical message for known
    /// type codes, else `"unknown exception type [N]"`.
    #[must_use]
    pub fn error_message(&self) -> String {
        if !self.message.is_empty() {
            return self.message.clone();
        }
        if let Some(m) = Self::canonical_message(self.type_id) {
            return m.to_string();
        }
        format!("unknown exception type [{}]", self.type_id)
    }

    /// Builds a new exception of the same kind and type code, with `prefix`
    /// prepended to the message.
    #[must_use]
    pub fn prepend_error(&self, prefix: &str) -> Self {
        Self {
            message: format!("{prefix}{}", self.error_message()),
            type_id: self.type_id,
            kind: self.kind,
        }
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() && Self::canonical_message(self.type_id).is_none() {
            write!(f, "unknown exception type [{}]", self.type_id)
        } else {
            write!(f, "{}", self.error_message())
        }
    }
}

impl std::error::Error for ApplicationException {}

const FIELD_MESSAGE: i16 = 1;
const FIELD_TYPE: i16 = 2;

impl FastCodec for ApplicationException {
    fn blength(&self) -> usize {
        // field header (1+2) + string + field header (1+2) + i32 + stop(1)
        3 + (4 + self.message.len()) + 3 + 4 + 1
    }

    fn fast_write_nocopy(&self, buf: &mut [u8], _writer: &mut dyn NocopyWriter) -> usize {
        let mut n = 0;
        buf[n] = ElementType::String as u8;
        n += 1;
        n += BinaryProtocol::write_i16(&mut buf[n..], FIELD_MESSAGE).unwrap();
        n += BinaryProtocol::write_string(&mut buf[n..], &self.message).unwrap();

        buf[n] = ElementType::I32 as u8;
        n += 1;
        n += BinaryProtocol::write_i16(&mut buf[n..], FIELD_TYPE).unwrap();
        n += BinaryProtocol::write_i32(&mut buf[n..], self.type_id).unwrap();

        buf[n] = ElementType::Stop as u8;
        n += 1;
        n
    }

    fn fast_read(&mut self, buf: &[u8]) -> Result<usize, ThriftError> {
        let mut n = 0;
        let mut message = String::new();
        let mut type_id = UNKNOWN;
        loop {
            need(buf.len(), n + 1)?;
            let field_ty = buf[n];
            n += 1;
            if field_ty == ElementType::Stop as u8 {
                break;
            }
            let (field_id, consumed) = BinaryProtocol::read_i16(&buf[n..])?;
            n += consumed;
            match (field_id, field_ty) {
                (FIELD_MESSAGE, t) if t == ElementType::String as u8 => {
                    let (s, consumed) = BinaryProtocol::read_string(&buf[n..])?;
                    message = s;
                    n += consumed;
                }
                (FIELD_TYPE, t) if t == ElementType::I32 as u8 => {
                    let (v, consumed) = BinaryProtocol::read_i32(&buf[n..])?;
                    type_id = v;
                    n += consumed;
                }
                (_, other) => {
                    let ty = ElementType::from_u8(other).ok_or_else(|| {
                        ThriftError::invalid_data(
                            crate::error::InvalidDataCode::InvalidData,
                            "unknown field type in ApplicationException",
                        )
                    })?;
                    n += crate::skip::skip(ty, &buf[n..])?;
                }
            }
        }
        self.message = message;
        self.type_id = type_id;
        self.kind = ExceptionKind::Application;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_fields() {
        let exc = ApplicationException::new(1, "t1");
        let mut buf = vec![0u8; exc.blength()];
        let mut sink = Vec::new();
        let n = exc.fast_write_nocopy(&mut buf, &mut sink);
        assert_eq!(n, buf.len());

        let mut decoded = ApplicationException::new(0, "");
        decoded.fast_read(&buf).unwrap();
        assert_eq!(decoded.type_id(), 1);
        assert_eq!(decoded.msg(), "t1");
    }

    #[test]
    fn unknown_type_renders_canonical_unknown_message() {
        let exc = ApplicationException::new(999, "");
        assert_eq!(exc.error_message(), "unknown exception type [999]");
    }

    #[test]
    fn known_type_without_message_renders_canonical_text() {
        let exc = ApplicationException::new(INTERNAL_ERROR, "");
        assert_eq!(exc.error_message(), "internal error");
    }

    #[test]
    fn fast_read_on_truncated_buffer_returns_short_buffer_error() {
        let exc = ApplicationException::new(1, "t1");
        let mut buf = vec![0u8; exc.blength()];
        let mut sink = Vec::new();
        exc.fast_write_nocopy(&mut buf, &mut sink);

        // Drop everything from the first field header onward: no field
        // type byte left to read, and no STOP either.
        let truncated = &buf[..0];
        let mut decoded = ApplicationException::new(0, "");
        let err = decoded.fast_read(truncated).unwrap_err();
        assert!(matches!(err, ThriftError::ShortBuffer { needed: 1, available: 0 }));
    }

    #[test]
    fn prepend_error_preserves_type_code() {
        let exc = ApplicationException::new(INTERNAL_ERROR, "disk full");
        let wrapped = exc.prepend_error("rpc failed: ");
        assert_eq!(wrapped.type_id(), INTERNAL_ERROR);
        assert_eq!(wrapped.msg(), "rpc failed: disk full");
    }
}
