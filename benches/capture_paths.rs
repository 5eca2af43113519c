use criterion::{criterion_group, criterion_main, Criterion};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use pageshot::capture::CaptureRequest;
use pageshot::idle::{IdleTracker, NetworkSample};
use pageshot::png::PngInfo;
use std::time::{Duration, Instant};

// Benchmarks for the browser-free parts of a capture. Run with:
//    cargo bench

fn png_of(width: u32, height: u32) -> Vec<u8> {
    // A gradient so the encoder produces non-trivial pixel data to decode.
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ColorType::Rgb8)
        .unwrap();
    out
}

fn bench_parse_query(c: &mut Criterion) {
    let query = "url=https%3A%2F%2Fexample.com%2Fpricing%3Fplan%3Dpro&ref=gallery";
    c.bench_function("parse_capture_query", |b| {
        b.iter(|| {
            let req = CaptureRequest::from_query(Some(query)).unwrap();
            req.target().unwrap()
        })
    });
}

fn bench_inspect_png(c: &mut Criterion) {
    let png = png_of(1280, 720);
    c.bench_function("inspect_png", |b| b.iter(|| PngInfo::inspect(&png).unwrap()));
}

fn bench_idle_tracker(c: &mut Criterion) {
    let start = Instant::now();
    let samples: Vec<(NetworkSample, Instant)> = (0..300u32)
        .map(|i| {
            let sample = NetworkSample {
                ready_state_complete: i > 20,
                inflight: if i < 150 { 4 } else { 1 },
                resources: i.min(200),
            };
            (sample, start + Duration::from_millis(u64::from(i) * 100))
        })
        .collect();

    c.bench_function("idle_tracker_300_samples", |b| {
        b.iter(|| {
            let mut tracker = IdleTracker::new(Duration::from_millis(500), 2);
            samples.iter().position(|(s, at)| tracker.observe(*s, *at))
        })
    });
}

criterion_group!(benches, bench_parse_query, bench_inspect_png, bench_idle_tracker);
criterion_main!(benches);
