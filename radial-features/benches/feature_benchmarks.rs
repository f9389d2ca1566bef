use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma};
use radial_features::{match_descriptors, OrbFeatureConfig, OrbFeatures};

/// Textured image: hashed noise over a horizontal gradient
fn create_benchmark_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let h = (x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263)).wrapping_mul(2_246_822_519);
        let noise = h >> 26;
        Luma([(x * 160 / width.max(1) + noise) as u8])
    })
}

/// Benchmark detection + description at several frame sizes
fn bench_detect_and_describe(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_and_describe");
    let orb = OrbFeatures::new(OrbFeatureConfig::default()).unwrap();

    for &(width, height) in &[(320u32, 240u32), (640, 480)] {
        let img = create_benchmark_image(width, height);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", width, height)), &img, |b, img| {
            b.iter(|| black_box(orb.detect_and_describe(black_box(img))))
        });
    }

    group.finish();
}

/// Benchmark brute-force Hamming matching
fn bench_matching(c: &mut Criterion) {
    let orb = OrbFeatures::new(OrbFeatureConfig { max_features: 1000, ..Default::default() }).unwrap();
    let img = create_benchmark_image(640, 480);
    let (_, desc) = orb.detect_and_describe(&img);

    let mut group = c.benchmark_group("matching");
    group.bench_function(format!("{}x{}", desc.len(), desc.len()), |b| {
        b.iter(|| black_box(match_descriptors(black_box(&desc), black_box(&desc))))
    });
    group.finish();
}

criterion_group!(benches, bench_detect_and_describe, bench_matching);
criterion_main!(benches);
