use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use flowstep::grid::{EdgeHalo, Partition, TileKind};
use flowstep::physics::{Discretization, DomainExtent, DonorCell};
use flowstep::topology::Direction;

fn bench_edge_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_extract_inject");
    for &n in &[64usize, 256] {
        let mut src = Partition::<f64>::new(TileKind::Owned, n, n, 0, 0);
        for j in 0..n {
            for i in 0..n {
                src.set(i, j, (i * n + j) as f64);
            }
        }
        let mut halo = Partition::<f64>::new(TileKind::Halo, n, n, -(n as i64), 0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let slice = src.extract_edge(Direction::Right);
                halo.inject_edge(Direction::Right, &slice);
            })
        });
    }
    group.finish();
}

fn bench_sor_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sor_sweep");
    for &n in &[64usize, 128] {
        let extent = DomainExtent {
            i_max: n - 2,
            j_max: n - 2,
        };
        let dc = DonorCell::default();
        let mut p = Partition::<f64>::new(TileKind::Owned, n, n, 0, 0);
        let mut rhs = Partition::<f64>::new(TileKind::Owned, n, n, 0, 0);
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                rhs.set(i, j, ((i * 31 + j * 17) % 7) as f64 - 3.0);
            }
        }
        let halo = EdgeHalo {
            left: vec![0.0; n],
            right: vec![0.0; n],
            bottom: vec![0.0; n],
            top: vec![0.0; n],
        };
        let h = 1.0 / (n - 2) as f64;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| dc.sor_sweep(&mut p, &halo, &rhs, extent, 1.7, h, h))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_edge_extraction, bench_sor_sweep);
criterion_main!(benches);
