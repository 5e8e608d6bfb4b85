//! Benchmarks for the face normalization stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{GrayImage, Luma};
use webcam_face_rec::alignment::{warp_affine, EyeAlignment};
use webcam_face_rec::filters::{equalize_hist, equalize_left_and_right_halves, BilateralFilter, EllipticalMask};
use webcam_face_rec::geometry::Point;
use webcam_face_rec::preprocess::{normalize_face, NormalizerSettings};

/// Face-like test image: gradient with two dark eye spots and some noise
fn face_crop(size: u32) -> GrayImage {
    let eye_y = size * 38 / 100;
    let eyes = [(size * 3 / 10, eye_y), (size * 7 / 10, eye_y)];
    let radius = (size / 20).max(1);
    GrayImage::from_fn(size, size, |x, y| {
        let dark = eyes
            .iter()
            .any(|&(ex, ey)| x.abs_diff(ex).pow(2) + y.abs_diff(ey).pow(2) <= radius * radius);
        if dark {
            Luma([15])
        } else {
            let base = 90 + (x * 80 / size) + (y * 40 / size);
            Luma([(base + rand::random::<u32>() % 12) as u8])
        }
    })
}

fn benchmark_equalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalization");

    for size in [70u32, 140] {
        let face = face_crop(size);
        group.bench_with_input(BenchmarkId::new("whole", size), &face, |b, face| {
            b.iter(|| equalize_hist(black_box(face)));
        });
        group.bench_with_input(BenchmarkId::new("split_halves", size), &face, |b, face| {
            b.iter(|| equalize_left_and_right_halves(black_box(face)));
        });
    }

    group.finish();
}

fn benchmark_smoothing_and_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("smoothing");
    let face = face_crop(70);

    for sigma_space in [1.0, 2.0, 4.0] {
        let filter = BilateralFilter::new(0, 20.0, sigma_space);
        group.bench_with_input(BenchmarkId::new("bilateral", sigma_space), &face, |b, face| {
            b.iter(|| filter.filter(black_box(face)));
        });
    }

    let mask = EllipticalMask::default();
    group.bench_function("elliptical_mask", |b| b.iter(|| mask.mask(black_box(&face))));

    group.finish();
}

fn benchmark_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");
    let crop = face_crop(200);
    let left = Point::new(60, 80);
    let right = Point::new(140, 70);

    group.bench_function("eye_alignment", |b| {
        b.iter(|| EyeAlignment::with_default_eyes(black_box(left), black_box(right), 70));
    });

    if let Some(alignment) = EyeAlignment::with_default_eyes(left, right, 70) {
        group.bench_function("warp_affine_70", |b| {
            b.iter(|| warp_affine(black_box(&crop), &alignment.transform, 70, 70, 128));
        });
    }

    let settings = NormalizerSettings::default();
    for separate_halves in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("normalize_face", if separate_halves { "split" } else { "whole" }),
            &crop,
            |b, crop| {
                b.iter(|| normalize_face(black_box(crop), left, right, 70, separate_halves, &settings));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_equalization,
    benchmark_smoothing_and_mask,
    benchmark_alignment
);
criterion_main!(benches);
