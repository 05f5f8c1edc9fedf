//! `AdaptRead`/`AdaptWrite`: the seam external callers (Apache-compatible
//! shims, generated service stubs) plug into. Both are ordinary generic
//! functions dispatched on the `bufiox` reader/writer capability rather
//! than a trait object with a reflection fallback — the reflective path
//! the wire format's author mentions as optional is deliberately left
//! out of this core; a caller without a `FastCodec` implementation has
//! no adaptor here.
use std::io::{Read, Write};

use bufrpc_bufio::{Reader as BufioReader, Writer as BufioWriter};
use bufrpc_thrift::{unmarshal_fast_msg, BinaryProtocol, FastCodec, MessageType, NocopyWriter, UnmarshalOutcome};
use bufrpc_ttheader::{decode, encode, DecodedHeader, EncodeParam};

use crate::error::Error;

/// Routes a [`FastCodec`] payload's nocopy fields straight into the
/// underlying `bufiox` writer instead of copying them into the message
/// buffer (spec §6 `AdaptWrite`).
struct BufioNocopyWriter<'a, W> {
    writer: &'a BufioWriter<W>,
    err: Option<Error>,
}

impl<W: Write> NocopyWriter for BufioNocopyWriter<'_, W> {
    fn write_direct(&mut self, bs: &[u8]) {
        if self.err.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_binary(bytes::Bytes::copy_from_slice(bs)) {
            self.err = Some(e.into());
        }
    }
}

/// One fully framed RPC message read off the wire: the TTHeader fields
/// plus the message-begin name/seq_id [`adapt_read`] decoded from the
/// payload.
pub struct ReadFrame {
    pub header: DecodedHeader,
    pub name: String,
    pub seq_id: i32,
}

/// Reads exactly one TTHeader-framed Thrift message from `reader` into
/// `target`, returning the header and message-begin fields alongside
/// (spec §6 `AdaptRead(target, protocol)`).
///
/// Requires the whole frame to already be on the wire; this performs
/// exactly one length-prefixed read, not a streaming decode.
pub fn adapt_read<R: Read>(target: &mut dyn FastCodec, reader: &BufioReader<R>) -> Result<ReadFrame, Error> {
    let len_bytes = reader.peek(4);
    if let Some(e) = len_bytes.err {
        return Err(e.into());
    }
    let total_length = u32::from_be_bytes(len_bytes.bytes.try_into().expect("peek(4) returns 4 bytes")) as usize;
    let frame_len = 4 + total_length;

    let frame = reader.next(frame_len)?;
    let header = decode(frame)?;
    let payload = &frame[header.header_len..header.header_len + header.payload_len];

    let outcome = unmarshal_fast_msg(payload, target)?;
    reader.release(None);

    match outcome {
        UnmarshalOutcome::Ok { name, seq_id } => Ok(ReadFrame { header, name, seq_id }),
        UnmarshalOutcome::Exception { exception, .. } => Err(Error::Remote(exception)),
    }
}

/// Serializes `msg` behind a TTHeader record into `writer` (spec §6
/// `AdaptWrite(source, protocol)`).
pub fn adapt_write<W: Write>(
    writer: &BufioWriter<W>,
    header: &EncodeParam,
    name: &str,
    msg_type: MessageType,
    seq_id: i32,
    msg: &dyn FastCodec,
) -> Result<(), Error> {
    let pending = encode(writer, header)?;

    let msg_header_len = BinaryProtocol::message_begin_length(name);
    let body_len = msg_header_len + msg.blength();
    let buf = writer.malloc(body_len)?;
    BinaryProtocol::write_message_begin(&mut buf[..msg_header_len], name, msg_type, seq_id)?;

    let mut nocopy = BufioNocopyWriter { writer, err: None };
    msg.fast_write_nocopy(&mut buf[msg_header_len..], &mut nocopy);
    if let Some(e) = nocopy.err {
        return Err(e);
    }

    let payload_len = writer.written_len() - pending.header_len();
    pending.finalize(payload_len);
    Ok(())
}
