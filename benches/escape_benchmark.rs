//! Escape parser benchmark: Measure input decoding throughput.
//!
//! Target: > 100 MB/s on mixed key and mouse traffic

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pixwin::local::EscapeParser;

/// Typing interleaved with pointer motion and button reports.
fn mixed_input(reports: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..reports {
        bytes.extend_from_slice(b"wasd");
        bytes.extend_from_slice(format!("\x1b[<35;{};{}M", i % 200 + 1, i % 50 + 1).as_bytes());
        if i % 10 == 0 {
            bytes.extend_from_slice(b"\x1b[<0;10;10M\x1b[<0;10;10m");
        }
    }
    bytes
}

fn parse_keys_only(c: &mut Criterion) {
    let bytes = b"the quick brown fox jumps over the lazy dog ".repeat(100);
    let mut group = c.benchmark_group("escape");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("keys_only", |b| {
        let mut out = Vec::with_capacity(bytes.len());
        b.iter(|| {
            out.clear();
            let mut parser = EscapeParser::new();
            parser.feed(black_box(&bytes), &mut out);
            out.len()
        })
    });
    group.finish();
}

fn parse_mixed(c: &mut Criterion) {
    let bytes = mixed_input(1000);
    let mut group = c.benchmark_group("escape");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("mixed_keys_and_mouse", |b| {
        let mut out = Vec::with_capacity(bytes.len());
        b.iter(|| {
            out.clear();
            let mut parser = EscapeParser::new();
            parser.feed(black_box(&bytes), &mut out);
            out.len()
        })
    });

    group.bench_function("mixed_byte_at_a_time", |b| {
        b.iter(|| {
            let mut parser = EscapeParser::new();
            bytes
                .iter()
                .filter_map(|&byte| parser.push(black_box(byte)))
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, parse_keys_only, parse_mixed);
criterion_main!(benches);
