use crate::element::{MessageType, VERSION_1, VERSION_MASK};
use crate::error::{InvalidDataCode, ThriftError};

fn need(buf_len: usize, needed: usize) -> Result<(), ThriftError> {
    if buf_len < needed {
        return Err(ThriftError::ShortBuffer { needed, available: buf_len });
    }
    Ok(())
}

/// Stateless encode/decode of single Thrift binary-protocol elements
/// (spec §4.3). Every method takes or returns plain slices; there is no
/// instance state, so a single value is safe to share across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryProtocol;

impl BinaryProtocol {
    // ---- fixed-size writes ----

    pub fn write_bool(buf: &mut [u8], v: bool) -> Result<usize, ThriftError> {
        need(buf.len(), 1)?;
        buf[0] = u8::from(v);
        Ok(1)
    }

    pub fn write_byte(buf: &mut [u8], v: i8) -> Result<usize, ThriftError> {
        need(buf.len(), 1)?;
        buf[0] = v as u8;
        Ok(1)
    }

    pub fn write_i16(buf: &mut [u8], v: i16) -> Result<usize, ThriftError> {
        need(buf.len(), 2)?;
        buf[..2].copy_from_slice(&v.to_be_bytes());
        Ok(2)
    }

    pub fn write_i32(buf: &mut [u8], v: i32) -> Result<usize, ThriftError> {
        need(buf.len(), 4)?;
        buf[..4].copy_from_slice(&v.to_be_bytes());
        Ok(4)
    }

    pub fn write_i64(buf: &mut [u8], v: i64) -> Result<usize, ThriftError> {
        need(buf.len(), 8)?;
        buf[..8].copy_from_slice(&v.to_be_bytes());
        Ok(8)
    }

    pub fn write_double(buf: &mut [u8], v: f64) -> Result<usize, ThriftError> {
        need(buf.len(), 8)?;
        buf[..8].copy_from_slice(&v.to_bits().to_be_bytes());
        Ok(8)
    }

    pub fn write_string(buf: &mut [u8], s: &str) -> Result<usize, ThriftError> {
        Self::write_binary(buf, s.as_bytes())
    }

    pub fn write_binary(buf: &mut [u8], bs: &[u8]) -> Result<usize, ThriftError> {
        need(buf.len(), 4 + bs.len())?;
        buf[..4].copy_from_slice(&(bs.len() as i32).to_be_bytes());
        buf[4..4 + bs.len()].copy_from_slice(bs);
        Ok(4 + bs.len())
    }

    // ---- append family ----

    pub fn append_bool(out: &mut Vec<u8>, v: bool) {
        out.push(u8::from(v));
    }

    pub fn append_byte(out: &mut Vec<u8>, v: i8) {
        out.push(v as u8);
    }

    pub fn append_i16(out: &mut Vec<u8>, v: i16) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn append_i32(out: &mut Vec<u8>, v: i32) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn append_i64(out: &mut Vec<u8>, v: i64) {
        out.extend_from_slice(&v.to_be_bytes());
    }

    pub fn append_double(out: &mut Vec<u8>, v: f64) {
        out.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    pub fn append_string(out: &mut Vec<u8>, s: &str) {
        Self::append_binary(out, s.as_bytes());
    }

    pub fn append_binary(out: &mut Vec<u8>, bs: &[u8]) {
        out.extend_from_slice(&(bs.len() as i32).to_be_bytes());
        out.extend_from_slice(bs);
    }

    // ---- fixed-size reads ----

    pub fn read_bool(buf: &[u8]) -> Result<(bool, usize), ThriftError> {
        need(buf.len(), 1)?;
        Ok((buf[0] != 0, 1))
    }

    pub fn read_byte(buf: &[u8]) -> Result<(i8, usize), ThriftError> {
        need(buf.len(), 1)?;
        Ok((buf[0] as i8, 1))
    }

    pub fn read_i16(buf: &[u8]) -> Result<(i16, usize), ThriftError> {
        need(buf.len(), 2)?;
        Ok((i16::from_be_bytes(buf[..2].try_into().unwrap()), 2))
    }

    pub fn read_i32(buf: &[u8]) -> Result<(i32, usize), ThriftError> {
        need(buf.len(), 4)?;
        Ok((i32::from_be_bytes(buf[..4].try_into().unwrap()), 4))
    }

    pub fn read_i64(buf: &[u8]) -> Result<(i64, usize), ThriftError> {
        need(buf.len(), 8)?;
        Ok((i64::from_be_bytes(buf[..8].try_into().unwrap()), 8))
    }

    pub fn read_double(buf: &[u8]) -> Result<(f64, usize), ThriftError> {
        need(buf.len(), 8)?;
        Ok((f64::from_bits(u64::from_be_bytes(buf[..8].try_into().unwrap())), 8))
    }

    /// Reads the 4-byte length prefix, rejecting a negative value.
    pub fn read_length(buf: &[u8]) -> Result<(usize, usize), ThriftError> {
        let (len, consumed) = Self::read_i32(buf)?;
        if len < 0 {
            return Err(ThriftError::invalid_data(
                InvalidDataCode::NegativeSize,
                format!("negative length {len}"),
            ));
        }
        Ok((len as usize, consumed))
    }

    pub fn read_binary(buf: &[u8]) -> Result<(&[u8], usize), ThriftError> {
        let (len, prefix) = Self::read_length(buf)?;
        need(buf.len(), prefix + len)?;
        Ok((&buf[prefix..prefix + len], prefix + len))
    }

    pub fn read_string(buf: &[u8]) -> Result<(String, usize), ThriftError> {
        let (bytes, consumed) = Self::read_binary(buf)?;
        // `copy_bytes` routes this copy through the shared arena allocator
        // when the span cache is enabled (crate::span_cache), a plain `Vec`
        // copy otherwise. Either way the UTF-8 check runs against the copy,
        // not the original window, so validation cost is unchanged by the
        // toggle.
        let s = String::from_utf8(crate::span_cache::copy_bytes(bytes))
            .map_err(|e| ThriftError::invalid_data(InvalidDataCode::InvalidData, e.to_string()))?;
        Ok((s, consumed))
    }

    // ---- message header ----

    /// `(version<<16)|type : u32`, `len(name) : u32`, name bytes, `seqID : i32`.
    pub fn write_message_begin(
        buf: &mut [u8],
        name: &str,
        msg_type: MessageType,
        seq_id: i32,
    ) -> Result<usize, ThriftError> {
        need(buf.len(), Self::message_begin_length(name))?;
        let word = VERSION_1 | (msg_type as u32 & 0x00FF);
        let mut n = Self::write_i32(buf, word as i32)?;
        n += Self::write_string(&mut buf[n..], name)?;
        n += Self::write_i32(&mut buf[n..], seq_id)?;
        Ok(n)
    }

    #[must_use]
    pub fn message_begin_length(name: &str) -> usize {
        4 + 4 + name.len() + 4
    }

    pub fn read_message_begin(
        buf: &[u8],
    ) -> Result<(String, MessageType, i32, usize), ThriftError> {
        let (word, mut n) = Self::read_i32(buf)?;
        let word = word as u32;
        if word & VERSION_MASK != VERSION_1 {
            return Err(ThriftError::invalid_data(
                InvalidDataCode::BadVersion,
                format!("bad message version word {word:#010x}"),
            ));
        }
        let msg_type = MessageType::from_u8((word & 0x00FF) as u8).ok_or_else(|| {
            ThriftError::invalid_data(InvalidDataCode::InvalidData, "unknown message type")
        })?;
        let (name, consumed) = Self::read_string(&buf[n..])?;
        n += consumed;
        let (seq_id, consumed) = Self::read_i32(&buf[n..])?;
        n += consumed;
        Ok((name, msg_type, seq_id, n))
    }
}
