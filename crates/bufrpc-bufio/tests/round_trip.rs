use std::io::Cursor;

use bufrpc_bufio::{Reader, Writer};
use bytes::Bytes;
use proptest::prelude::*;

/// Writing an arbitrary sequence of chunks through [`Writer`] and reading
/// them back through [`Reader`] must reproduce the exact byte stream,
/// regardless of chunk sizes relative to `DEFAULT_BUF_SIZE` (spec §8,
/// "bufiox round-trip").
fn round_trip(chunks: &[Vec<u8>]) {
    let mut sink = Vec::new();
    {
        let w = Writer::new(&mut sink);
        for chunk in chunks {
            if chunk.len() > bufrpc_bufio::DIRECT_READ_THRESHOLD {
                w.write_binary(Bytes::from(chunk.clone())).unwrap();
            } else {
                w.malloc(chunk.len()).unwrap().copy_from_slice(chunk);
            }
        }
        w.flush().unwrap();
    }

    let expected: Vec<u8> = chunks.iter().flatten().copied().collect();
    assert_eq!(sink, expected);

    let r = Reader::new(Cursor::new(sink.clone()));
    let mut got = Vec::new();
    let mut remaining = expected.len();
    while remaining > 0 {
        let take = remaining.min(777);
        got.extend_from_slice(r.next(take).unwrap());
        remaining -= take;
    }
    assert_eq!(got, expected);
}

proptest! {
    #[test]
    fn writer_reader_round_trip(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..9000),
        0..20,
    )) {
        round_trip(&chunks);
    }
}

#[test]
fn empty_stream_round_trips() {
    round_trip(&[]);
}

#[test]
fn single_large_direct_chunk_round_trips() {
    round_trip(&[vec![42u8; bufrpc_bufio::DIRECT_READ_THRESHOLD * 3]]);
}
