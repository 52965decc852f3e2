use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pooljson::wire;

fn sample_events(count: usize) -> String {
    let mut out = String::from("[");
    for index in 0..count {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            r#"{{"seq":{index},"id":"123e4567-e89b-12d3-a456-{:012x}","at":"2021-06-01T12:30:45.{:09}Z","level":"info","latency":{}.5,"tags":["a","b"]}}"#,
            index,
            index % 1_000_000_000,
            index % 500
        ));
    }
    out.push(']');
    out
}

fn bench_wire(c: &mut Criterion) {
    let text = sample_events(1_000);
    let doc = pooljson::parse_str(&text).expect("parse failed");
    let frame = wire::to_vec(doc.root()).expect("encode failed");

    let mut group = c.benchmark_group("wire");
    group.bench_function("size", |b| {
        b.iter(|| black_box(wire::size(black_box(doc.root()))));
    });
    group.bench_function("encode", |b| {
        b.iter(|| black_box(wire::to_vec(black_box(doc.root())).expect("encode failed")));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(wire::parse(black_box(&frame)).expect("decode failed")));
    });
    group.bench_function("to_json", |b| {
        b.iter(|| black_box(wire::to_json(black_box(&frame), 0).expect("to_json failed")));
    });
    group.finish();
}

criterion_group!(benches, bench_wire);
criterion_main!(benches);
