//! Frame decoding benchmark suite.
//!
//! Benchmarks the protobuf decoder on data frames of increasing batch size
//! and the acknowledgement encoder.
//!
//! Run with: cargo bench --bench decode
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use prost::Message;

use webcast_live::protocol::{
    FRAME_TYPE_MESSAGE, FrameDecoder, ProtobufDecoder, WebcastMessage, WebcastPushFrame,
    WebcastResponse, encode_ack,
};
use webcast_live::{PushMessageId, RawFrame};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BATCH_SIZES: &[usize] = &[1, 16, 128];
const PAYLOAD_BYTES: usize = 256;

// ============================================================================
// Fixtures
// ============================================================================

fn frame(batch: usize) -> RawFrame {
    let response = WebcastResponse {
        messages: (0..batch)
            .map(|_| WebcastMessage {
                r#type: "WebcastChatMessage".into(),
                binary: vec![0xAB; PAYLOAD_BYTES],
            })
            .collect(),
        cursor: "1700000000000_7301234567890123456".into(),
        internal_ext: "internal_src:dim|wss_push_room_id:7301234567890123456".into(),
        need_ack: true,
        ..Default::default()
    };

    WebcastPushFrame {
        id: 7_301_234_567,
        r#type: FRAME_TYPE_MESSAGE.into(),
        binary: response.encode_to_vec(),
    }
    .encode_to_vec()
    .into()
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let decoder = ProtobufDecoder::new();
    let mut group = c.benchmark_group("decode");

    for &batch in BATCH_SIZES {
        let frame = frame(batch);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("frame", batch), &frame, |b, frame| {
            b.iter(|| decoder.decode(black_box(frame)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Ack
// ============================================================================

fn bench_encode_ack(c: &mut Criterion) {
    let ext = "internal_src:dim|wss_push_room_id:7301234567890123456";

    c.bench_function("encode_ack", |b| {
        b.iter(|| encode_ack(black_box(PushMessageId::new(42)), black_box(ext)));
    });
}

criterion_group!(benches, bench_decode, bench_encode_ack);
criterion_main!(benches);
