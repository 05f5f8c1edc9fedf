use std::collections::HashMap;

use bufrpc_bufio::Writer;
use bufrpc_ttheader::{decode, encode, EncodeParam, ProtocolId};
use proptest::prelude::*;

fn round_trip(seq_id: i32, flags: u16, int_info: HashMap<u16, String>, str_info: HashMap<String, String>, payload: &[u8]) {
    let param = EncodeParam {
        flags,
        seq_id,
        protocol_id: Some(ProtocolId::ThriftBinary),
        transform_ids: vec![],
        int_info: int_info.clone(),
        str_info: str_info.clone(),
    };

    let mut sink = Vec::new();
    {
        let writer = Writer::new(&mut sink);
        let pending = encode(&writer, &param).unwrap();
        writer.write_binary(bytes::Bytes::copy_from_slice(payload)).unwrap();
        pending.finalize(payload.len());
        writer.flush().unwrap();
    }

    let decoded = decode(&sink).unwrap();
    assert_eq!(decoded.flags, flags);
    assert_eq!(decoded.seq_id, seq_id);
    assert_eq!(decoded.protocol_id, ProtocolId::ThriftBinary);
    assert_eq!(decoded.int_info, int_info);
    assert_eq!(decoded.str_info, str_info);
    assert_eq!(decoded.payload_len, payload.len());
    assert_eq!(decoded.header_len, sink.len() - payload.len());
}

proptest! {
    /// "TTHeader round-trip" (spec §8): Encode then Decode returns
    /// identical Flags/SeqID/ProtocolID/IntInfo/StrInfo, and HeaderLen /
    /// PayloadLen correctly partition the encoded stream.
    #[test]
    fn ttheader_round_trips(
        seq_id in any::<i32>(),
        flags in any::<u16>(),
        int_keys in proptest::collection::vec((any::<u16>(), ".{0,40}"), 0..5),
        str_keys in proptest::collection::vec(("[a-z]{1,10}", ".{0,40}"), 0..5),
        payload in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let int_info: HashMap<u16, String> = int_keys.into_iter().collect();
        let str_info: HashMap<String, String> = str_keys.into_iter().collect();
        round_trip(seq_id, flags, int_info, str_info, &payload);
    }
}

#[test]
fn acl_token_round_trips_under_reserved_key() {
    let mut str_info = HashMap::new();
    str_info.insert("idl".to_string(), "a.b.c".to_string());
    str_info.insert(bufrpc_ttheader::ACL_TOKEN_KEY.to_string(), "token".to_string());
    round_trip(42, 0, HashMap::new(), str_info, b"payload-bytes");
}
