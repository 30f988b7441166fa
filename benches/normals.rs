use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nalgebra::Vector3;

use meshtools::duplicate;
use meshtools::normal;

const RESOLUTION: u32 = 128;

// Triangulated height field with `RESOLUTION` quads along each axis.
fn grid() -> (Vec<u32>, Vec<Vector3<f32>>) {
    let width = RESOLUTION + 1;
    let positions = (0..width)
        .flat_map(|z| (0..width).map(move |x| (x, z)))
        .map(|(x, z)| {
            let (x, z) = (x as f32, z as f32);
            Vector3::new(x, (x * 0.25).sin() * (z * 0.25).cos(), z)
        })
        .collect::<Vec<_>>();
    let indices = (0..RESOLUTION)
        .flat_map(|z| (0..RESOLUTION).map(move |x| (x, z)))
        .flat_map(|(x, z)| {
            let a = z * width + x;
            let b = a + 1;
            let c = a + width;
            let d = c + 1;
            [a, c, b, b, c, d]
        })
        .collect::<Vec<_>>();
    (indices, positions)
}

fn benchmark(criterion: &mut Criterion) {
    let (indices, positions) = grid();
    let triangles = duplicate::duplicate(&indices, &positions).unwrap();

    criterion.bench_function("flat normals", |bencher| {
        bencher.iter(|| normal::generate_flat_normals(&triangles).unwrap())
    });
    criterion.bench_function("smooth normals", |bencher| {
        bencher.iter(|| normal::generate_smooth_normals(&indices, &positions).unwrap())
    });
    criterion.bench_function("smooth normals into", |bencher| {
        bencher.iter_batched_ref(
            || vec![Vector3::<f32>::zeros(); positions.len()],
            |normals| normal::generate_smooth_normals_into(&indices, &positions, normals).unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
