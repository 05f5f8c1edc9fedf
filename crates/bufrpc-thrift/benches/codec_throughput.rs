use bufrpc_thrift::{skip, BinaryProtocol, ElementType, MessageType};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

fn bench_message_begin(c: &mut Criterion) {
    let mut buf = vec![0u8; BinaryProtocol::message_begin_length("benchMethod")];
    let mut group = c.benchmark_group("message_begin");
    group.throughput(Throughput::Elements(1));
    group.bench_function("write", |b| {
        b.iter(|| {
            BinaryProtocol::write_message_begin(&mut buf, "benchMethod", MessageType::Call, 1)
                .unwrap();
        });
    });
    group.bench_function("read", |b| {
        BinaryProtocol::write_message_begin(&mut buf, "benchMethod", MessageType::Call, 1)
            .unwrap();
        b.iter(|| {
            BinaryProtocol::read_message_begin(&buf).unwrap();
        });
    });
    group.finish();
}

fn bench_skip_struct(c: &mut Criterion) {
    let mut buf = Vec::new();
    for i in 0..64 {
        buf.push(ElementType::I64 as u8);
        BinaryProtocol::append_i16(&mut buf, i);
        BinaryProtocol::append_i64(&mut buf, i as i64);
    }
    buf.push(ElementType::Stop as u8);

    let mut group = c.benchmark_group("skip_struct");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("64_i64_fields", |b| {
        b.iter(|| {
            skip(ElementType::Struct, &buf).unwrap();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_message_begin, bench_skip_struct);
criterion_main!(benches);
