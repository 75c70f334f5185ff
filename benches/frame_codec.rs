//! Frame codec benchmark suite.
//!
//! Benchmarks the hot path of the read loop:
//! - Header encode/decode
//! - Brotli inflation of a command batch
//! - Batch classification at different batch sizes
//!
//! Run with: cargo bench --bench frame_codec
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::io::Write;

use blive::protocol::{CommandBatch, Frame, FrameHeader, Inflater, Operation, SubProtocol};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 16, 128];

const DANMAKU: &str = r#"{"cmd":"DANMU_MSG:4:0:2:2:2:0","info":[[0,1,25,16777215,1700000000000,0,0,"",0,0,0,"",0],"hello from the bench",[123456,"viewer",0,0,0,10000,1,""],[],[12,0,6406234,">50000",0],["",""],0,0,null,{"ts":1700000000,"ct":"ABCDEF"},0,0,null,null,0,105]}"#;

// ============================================================================
// Fixtures
// ============================================================================

fn batch_payload(size: usize) -> Vec<u8> {
    (0..size)
        .flat_map(|_| {
            Frame::with_protocol(
                Operation::Command,
                SubProtocol::Raw,
                0,
                DANMAKU.as_bytes().to_vec(),
            )
            .expect("frame")
            .encode()
        })
        .collect()
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 9, 22);
        writer.write_all(data).expect("compress");
    }
    out
}

// ============================================================================
// Benchmark: Header
// ============================================================================

fn bench_header(c: &mut Criterion) {
    let header = FrameHeader::new(Operation::Heartbeat, SubProtocol::HeartbeatAuth, 7, 32)
        .expect("header");
    let raw = header.to_bytes();

    let mut group = c.benchmark_group("header");
    group.bench_function("encode", |b| b.iter(|| black_box(&header).to_bytes()));
    group.bench_function("decode", |b| {
        b.iter(|| FrameHeader::decode(black_box(&raw)).expect("decode"))
    });
    group.finish();
}

// ============================================================================
// Benchmark: Command Batch
// ============================================================================

fn bench_batch(c: &mut Criterion) {
    let inflater = Inflater::default();

    let mut group = c.benchmark_group("command_batch");
    for &size in BATCH_SIZES {
        let payload = batch_payload(size);
        let compressed = compress(&payload);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("classify", size), &payload, |b, payload| {
            b.iter(|| CommandBatch::framed(black_box(payload)).count())
        });

        group.bench_with_input(
            BenchmarkId::new("inflate_classify", size),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    let inflated = inflater.inflate(black_box(compressed)).expect("inflate");
                    CommandBatch::framed(&inflated).count()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_header, bench_batch);
criterion_main!(benches);
