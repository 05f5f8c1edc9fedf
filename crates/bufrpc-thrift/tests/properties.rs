use bufrpc_thrift::{skip, ApplicationException, BinaryProtocol, ElementType, FastCodec};
use proptest::prelude::*;

/// "Skip equals append" (spec §8): encoding a value with `Append*` then
/// skipping the same bytes consumes exactly the encoded length.
proptest! {
    #[test]
    fn skip_consumes_exactly_the_appended_string(s in ".{0,500}") {
        let mut buf = Vec::new();
        BinaryProtocol::append_string(&mut buf, &s);
        let consumed = skip(ElementType::String, &buf).unwrap();
        prop_assert_eq!(consumed, buf.len());
    }

    #[test]
    fn skip_consumes_exactly_the_appended_i32(v in any::<i32>()) {
        let mut buf = Vec::new();
        BinaryProtocol::append_i32(&mut buf, v);
        let consumed = skip(ElementType::I32, &buf).unwrap();
        prop_assert_eq!(consumed, buf.len());
    }

    /// "Exception round-trip" (spec §8): for any (code, message), marshal
    /// then unmarshal preserves both fields.
    #[test]
    fn exception_round_trips_code_and_message(code in any::<i32>(), msg in ".{0,2000}") {
        let exc = ApplicationException::new(code, msg.clone());
        let mut buf = vec![0u8; exc.blength()];
        let mut sink = Vec::new();
        exc.fast_write_nocopy(&mut buf, &mut sink);

        let mut decoded = ApplicationException::new(0, "");
        decoded.fast_read(&buf).unwrap();
        prop_assert_eq!(decoded.type_id(), code);
        prop_assert_eq!(decoded.msg(), msg);
    }
}

#[test]
fn binary_round_trip_scenario() {
    use bufrpc_thrift::MessageType;

    let mut buf = vec![0u8; BinaryProtocol::message_begin_length("hello")];
    BinaryProtocol::write_message_begin(&mut buf, "hello", MessageType::Call, 7).unwrap();
    buf.push(ElementType::Bool as u8);
    BinaryProtocol::append_i16(&mut buf, 1);
    BinaryProtocol::append_bool(&mut buf, true);
    buf.push(ElementType::I32 as u8);
    BinaryProtocol::append_i16(&mut buf, 2);
    BinaryProtocol::append_i32(&mut buf, 0x7FFF_FFFF);
    buf.push(ElementType::Stop as u8);

    let (name, ty, seq, mut n) = BinaryProtocol::read_message_begin(&buf).unwrap();
    assert_eq!(name, "hello");
    assert_eq!(ty, MessageType::Call);
    assert_eq!(seq, 7);

    let field_ty = buf[n];
    n += 1;
    assert_eq!(field_ty, ElementType::Bool as u8);
    let (field_id, consumed) = BinaryProtocol::read_i16(&buf[n..]).unwrap();
    n += consumed;
    assert_eq!(field_id, 1);
    let (v, consumed) = BinaryProtocol::read_bool(&buf[n..]).unwrap();
    n += consumed;
    assert!(v);

    let field_ty = buf[n];
    n += 1;
    assert_eq!(field_ty, ElementType::I32 as u8);
    let (field_id, consumed) = BinaryProtocol::read_i16(&buf[n..]).unwrap();
    n += consumed;
    assert_eq!(field_id, 2);
    let (v, consumed) = BinaryProtocol::read_i32(&buf[n..]).unwrap();
    n += consumed;
    assert_eq!(v, 2147483647);

    assert_eq!(buf[n], ElementType::Stop as u8);
}

#[test]
fn skip_decoder_exact_bytes_scenario() {
    use bufrpc_thrift::SliceSkipDecoder;

    let mut buf = Vec::new();
    // byte(1)
    BinaryProtocol::append_byte(&mut buf, 1);
    let byte_end = buf.len();
    // str("hello")
    BinaryProtocol::append_string(&mut buf, "hello");
    let str_end = buf.len();
    // list<i32>[1]
    buf.push(ElementType::I32 as u8);
    BinaryProtocol::append_i32(&mut buf, 1);
    BinaryProtocol::append_i32(&mut buf, 1);
    let list_end = buf.len();
    // map<string,i64>{"hello":2}
    buf.push(ElementType::String as u8);
    buf.push(ElementType::I64 as u8);
    BinaryProtocol::append_i32(&mut buf, 1);
    BinaryProtocol::append_string(&mut buf, "hello");
    BinaryProtocol::append_i64(&mut buf, 2);
    let map_end = buf.len();
    // struct{field 1 = i64(11), stop}
    buf.push(ElementType::I64 as u8);
    BinaryProtocol::append_i16(&mut buf, 1);
    BinaryProtocol::append_i64(&mut buf, 11);
    buf.push(ElementType::Stop as u8);
    let struct_end = buf.len();

    let mut d = SliceSkipDecoder::new(&buf);
    let a = d.skip_next(ElementType::Byte).unwrap();
    let b = d.skip_next(ElementType::String).unwrap();
    let c = d.skip_next(ElementType::List).unwrap();
    let m = d.skip_next(ElementType::Map).unwrap();
    let s = d.skip_next(ElementType::Struct).unwrap();

    let mut reassembled = Vec::new();
    reassembled.extend_from_slice(a);
    reassembled.extend_from_slice(b);
    reassembled.extend_from_slice(c);
    reassembled.extend_from_slice(m);
    reassembled.extend_from_slice(s);
    assert_eq!(reassembled, buf);
    assert_eq!(a.len(), byte_end);
    assert_eq!(b.len(), str_end - byte_end);
    assert_eq!(c.len(), list_end - str_end);
    assert_eq!(m.len(), map_end - list_end);
    assert_eq!(s.len(), struct_end - map_end);
}
