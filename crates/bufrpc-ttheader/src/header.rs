use std::collections::HashMap;
use std::io::Write;

use bufrpc_bufio::Writer as BufioWriter;

use crate::error::TTHeaderError;
use crate::protocol::ProtocolId;

pub const MAGIC: u16 = 0x1000;
const META_LEN: usize = 4 + 2 + 2 + 4 + 2; // total_length, magic, flags, seq_id, info_size

const INFO_ID_PADDING: u8 = 0x00;
const INFO_ID_KEY_VALUE: u8 = 0x01;
const INFO_ID_INT_KEY_VALUE: u8 = 0x10;
const INFO_ID_ACL_TOKEN: u8 = 0x11;

/// `StrInfo` key reserved for the value routed through the dedicated ACL
/// section (`InfoIDACLToken`) instead of the generic key-value section
/// (spec §4.4).
pub const ACL_TOKEN_KEY: &str = "GDPRToken";

const MIN_INFO_WORDS: usize = 2;
const MAX_INFO_WORDS: usize = 65535;

/// Default cap on a decoded header's total length (spec.md's stated 64 KiB
/// default), independent of the wire format's own 65535-word info-size
/// limit.
pub const DEFAULT_MAX_HEADER_LEN: usize = 64 * 1024;

/// Tunable decode-time header-size cap; see [`decode_with_config`].
#[derive(Debug, Clone, Copy)]
pub struct HeaderConfig {
    pub max_header_len: usize,
}

impl HeaderConfig {
    #[must_use]
    pub const fn new(max_header_len: usize) -> Self {
        assert!(max_header_len > 0, "max_header_len must be non-zero");
        Self { max_header_len }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_LEN)
    }
}

/// Everything needed to encode one TTHeader record (spec §3, §4.4).
#[derive(Debug, Clone, Default)]
pub struct EncodeParam {
    pub flags: u16,
    pub seq_id: i32,
    pub protocol_id: Option<ProtocolId>,
    pub transform_ids: Vec<u8>,
    pub int_info: HashMap<u16, String>,
    pub str_info: HashMap<String, String>,
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_u16(out, s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}

fn build_header_info(param: &EncodeParam) -> Vec<u8> {
    let protocol_id = param.protocol_id.unwrap_or(ProtocolId::ThriftBinary);
    let mut info = Vec::new();
    info.push(protocol_id as u8);
    info.push(param.transform_ids.len() as u8);
    info.extend_from_slice(&param.transform_ids);

    if !param.int_info.is_empty() {
        info.push(INFO_ID_INT_KEY_VALUE);
        put_u16(&mut info, param.int_info.len() as u16);
        for (k, v) in &param.int_info {
            put_u16(&mut info, *k);
            put_str(&mut info, v);
        }
    }

    let acl = param.str_info.get(ACL_TOKEN_KEY);
    let plain_kv: Vec<_> = param.str_info.iter().filter(|(k, _)| k.as_str() != ACL_TOKEN_KEY).collect();
    if !plain_kv.is_empty() {
        info.push(INFO_ID_KEY_VALUE);
        put_u16(&mut info, plain_kv.len() as u16);
        for (k, v) in plain_kv {
            put_str(&mut info, k);
            put_str(&mut info, v);
        }
    }

    if let Some(token) = acl {
        info.push(INFO_ID_ACL_TOKEN);
        put_str(&mut info, token);
    }

    while info.len() % 4 != 0 {
        info.push(INFO_ID_PADDING);
    }
    info
}

/// A 4-byte length slot written before the payload's size is known. The
/// caller must call [`PendingHeader::finalize`] once the payload has been
/// written — the slot aliases the writer's internal buffer and stays
/// valid until `Flush`, exactly the way any other deferred `Malloc`
/// window does (spec §9).
pub struct PendingHeader<'a> {
    length_slot: &'a mut [u8],
    header_len: usize,
}

impl<'a> PendingHeader<'a> {
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn finalize(self, payload_len: usize) {
        let total = (self.header_len - 4 + payload_len) as u32;
        self.length_slot.copy_from_slice(&total.to_be_bytes());
    }
}

/// Encodes the TTHeader meta and header-info block through `writer`,
/// returning a pending length slot the caller finalizes once the payload
/// length is known (spec §4.4).
pub fn encode<W: Write>(
    writer: &BufioWriter<W>,
    param: &EncodeParam,
) -> Result<PendingHeader<'_>, TTHeaderError> {
    let info = build_header_info(param);
    let info_words = info.len() / 4;
    if !(MIN_INFO_WORDS..=MAX_INFO_WORDS).contains(&info_words) {
        return Err(TTHeaderError::HeaderInfoSizeOutOfRange(info_words));
    }
    let header_len = META_LEN + info.len();

    let meta = writer.malloc(META_LEN)?;
    let length_slot = {
        let (length_part, rest) = meta.split_at_mut(4);
        length_part.copy_from_slice(&0u32.to_be_bytes());
        let (magic_part, rest) = rest.split_at_mut(2);
        magic_part.copy_from_slice(&MAGIC.to_be_bytes());
        let (flags_part, rest) = rest.split_at_mut(2);
        flags_part.copy_from_slice(&param.flags.to_be_bytes());
        let (seq_part, rest) = rest.split_at_mut(4);
        seq_part.copy_from_slice(&param.seq_id.to_be_bytes());
        rest.copy_from_slice(&(info_words as u16).to_be_bytes());
        length_part
    };

    writer.malloc(info.len())?.copy_from_slice(&info);

    Ok(PendingHeader { length_slot, header_len })
}

/// Result of [`decode`]: `header_len`/`payload_len` are absolute byte
/// counts for the caller's framing layer (spec §4.4).
#[derive(Debug, Clone)]
pub struct DecodedHeader {
    pub flags: u16,
    pub seq_id: i32,
    pub protocol_id: ProtocolId,
    pub transform_ids: Vec<u8>,
    pub int_info: HashMap<u16, String>,
    pub str_info: HashMap<String, String>,
    pub header_len: usize,
    pub payload_len: usize,
}

fn need(buf: &[u8], n: usize) -> Result<(), TTHeaderError> {
    if buf.len() < n {
        return Err(TTHeaderError::ShortBuffer { needed: n, available: buf.len() });
    }
    Ok(())
}

fn read_u16(buf: &[u8], pos: &mut usize) -> Result<u16, TTHeaderError> {
    need(&buf[*pos..], 2)?;
    let v = u16::from_be_bytes([buf[*pos], buf[*pos + 1]]);
    *pos += 2;
    Ok(v)
}

fn read_str(buf: &[u8], pos: &mut usize) -> Result<String, TTHeaderError> {
    let len = read_u16(buf, pos)? as usize;
    need(&buf[*pos..], len)?;
    let s = String::from_utf8_lossy(&buf[*pos..*pos + len]).into_owned();
    *pos += len;
    Ok(s)
}

/// Parses a TTHeader record at the start of `buf`, using the default header
/// size cap.
pub fn decode(buf: &[u8]) -> Result<DecodedHeader, TTHeaderError> {
    decode_with_config(buf, HeaderConfig::default())
}

/// As [`decode`], rejecting headers longer than `config.max_header_len`.
pub fn decode_with_config(buf: &[u8], config: HeaderConfig) -> Result<DecodedHeader, TTHeaderError> {
    need(buf, META_LEN)?;
    let total_length = u32::from_be_bytes(buf[0..4].try_into().unwrap());
    let magic = u16::from_be_bytes(buf[4..6].try_into().unwrap());
    if magic != MAGIC {
        return Err(TTHeaderError::BadMagic(magic));
    }
    let flags = u16::from_be_bytes(buf[6..8].try_into().unwrap());
    let seq_id = i32::from_be_bytes(buf[8..12].try_into().unwrap());
    let info_words = u16::from_be_bytes(buf[12..14].try_into().unwrap()) as usize;
    if !(MIN_INFO_WORDS..=MAX_INFO_WORDS).contains(&info_words) {
        return Err(TTHeaderError::HeaderInfoSizeOutOfRange(info_words));
    }

    let info_len = info_words * 4;
    need(buf, META_LEN + info_len)?;
    let info = &buf[META_LEN..META_LEN + info_len];

    let mut pos = 0usize;
    need(info, 1)?;
    let protocol_id = ProtocolId::from_u8(info[pos])?;
    pos += 1;
    need(&info[pos..], 1)?;
    let transform_count = info[pos] as usize;
    pos += 1;
    need(&info[pos..], transform_count)?;
    let transform_ids = info[pos..pos + transform_count].to_vec();
    pos += transform_count;

    let mut int_info = HashMap::new();
    let mut str_info = HashMap::new();

    while pos < info.len() {
        let info_id = info[pos];
        pos += 1;
        match info_id {
            INFO_ID_PADDING => break,
            INFO_ID_KEY_VALUE => {
                let count = read_u16(info, &mut pos)?;
                for _ in 0..count {
                    let k = read_str(info, &mut pos)?;
                    let v = read_str(info, &mut pos)?;
                    str_info.insert(k, v);
                }
            }
            INFO_ID_INT_KEY_VALUE => {
                let count = read_u16(info, &mut pos)?;
                for _ in 0..count {
                    let k = read_u16(info, &mut pos)?;
                    let v = read_str(info, &mut pos)?;
                    int_info.insert(k, v);
                }
            }
            INFO_ID_ACL_TOKEN => {
                let v = read_str(info, &mut pos)?;
                str_info.insert(ACL_TOKEN_KEY.to_string(), v);
            }
            other => return Err(TTHeaderError::UnknownInfoId(other)),
        }
    }

    let header_len = META_LEN + info_len;
    if header_len > config.max_header_len {
        return Err(TTHeaderError::HeaderTooLarge { len: header_len, cap: config.max_header_len });
    }
    let overhead = header_len - 4;
    let payload_len = (total_length as usize)
        .checked_sub(overhead)
        .ok_or(TTHeaderError::TotalLengthUnderflow { total: total_length, overhead })?;

    Ok(DecodedHeader {
        flags,
        seq_id,
        protocol_id,
        transform_ids,
        int_info,
        str_info,
        header_len,
        payload_len,
    })
}
