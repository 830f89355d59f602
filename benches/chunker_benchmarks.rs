//! Performance benchmarks for the capture path
//!
//! Run with: cargo bench --features recording
//!
//! The chunker runs on the camera callback thread, so `consume` must stay
//! cheap; still rendering and encoding are measured alongside for scale.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use face_liveness_capture::testing::{synthetic_pixel_buffer, RecordingWriter};
use face_liveness_capture::{
    render_still, Frame, MediaTime, PixelFormat, VideoChunker, PRESENTATION_TIMESCALE,
};
use std::time::Duration;

const FORMATS: [PixelFormat; 3] = [PixelFormat::Rgb24, PixelFormat::Bgra32, PixelFormat::Nv12];

fn bench_timestamp_rebase(c: &mut Criterion) {
    let origin = MediaTime::from_nanos(5_000_000_000);
    let now = MediaTime::from_nanos(5_033_333_333);

    c.bench_function("rebase_timestamp", |b| {
        b.iter(|| black_box(now).checked_sub(black_box(origin), PRESENTATION_TIMESCALE))
    });
}

fn bench_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("Chunker consume");
    let buffer = synthetic_pixel_buffer(0, 480, 640, PixelFormat::Nv12);

    group.bench_function("writing", |b| {
        let mut chunker = VideoChunker::new(RecordingWriter::new());
        chunker.start();
        let mut nanos = 0i64;
        b.iter(|| {
            nanos += 33_333_333;
            chunker.consume(black_box(&Frame::new(
                buffer.clone(),
                MediaTime::from_nanos(nanos),
            )));
        })
    });

    group.bench_function("writer_busy", |b| {
        let writer = RecordingWriter::new();
        writer.set_ready(false);
        let mut chunker = VideoChunker::new(writer);
        chunker.start();
        let frame = Frame::new(buffer.clone(), MediaTime::from_nanos(0));
        b.iter(|| chunker.consume(black_box(&frame)))
    });

    group.finish();
}

fn bench_render_still(c: &mut Criterion) {
    let mut group = c.benchmark_group("Still rendering");
    group.measurement_time(Duration::from_secs(5));

    for format in FORMATS {
        let buffer = synthetic_pixel_buffer(7, 480, 640, format);
        group.throughput(Throughput::Elements(480 * 640));
        group.bench_with_input(
            BenchmarkId::new("render_still", format.as_str()),
            &buffer,
            |b, buffer| b.iter(|| render_still(black_box(buffer))),
        );
    }

    group.finish();
}

#[cfg(feature = "recording")]
fn bench_h264_encoding(c: &mut Criterion) {
    use face_liveness_capture::recording::H264Encoder;

    let mut group = c.benchmark_group("H264 Encoding");
    group.measurement_time(Duration::from_secs(10));

    for format in FORMATS {
        let buffer = synthetic_pixel_buffer(0, 480, 640, format);
        group.throughput(Throughput::Elements(480 * 640));
        group.bench_with_input(
            BenchmarkId::new("encode_frame", format.as_str()),
            &buffer,
            |b, buffer| {
                let mut encoder = H264Encoder::new(480, 640, 30.0, 1_000_000).expect("encoder");
                b.iter(|| encoder.encode(black_box(buffer)).expect("encode"))
            },
        );
    }

    group.finish();
}

#[cfg(not(feature = "recording"))]
fn bench_h264_encoding(_c: &mut Criterion) {}

criterion_group!(
    benches,
    bench_timestamp_rebase,
    bench_consume,
    bench_render_still,
    bench_h264_encoding,
);
criterion_main!(benches);
