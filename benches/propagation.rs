//! Benchmarks for the three propagation methods on a heavy-tailed graph.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use netprop::{
    build_start, rank, DiffusionKernel, Graph, PersonalizedPageRank, RandomWalkWithRestart,
};
use rand::prelude::*;
use rand::SeedableRng;
use std::hint::black_box;

/// Preferential attachment graph (Barabási–Albert) with `m` edges per new node
/// and confidence-like weights in `[0.15, 1.0)`.
fn barabasi_albert(n: usize, m: usize, seed: u64) -> Graph {
    assert!(n > m && m >= 1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges: Vec<(String, String, f64)> = Vec::new();
    let mut targets: Vec<usize> = Vec::new();

    let init = m + 1;
    for i in 0..init {
        for j in (i + 1)..init {
            edges.push((format!("p{i}"), format!("p{j}"), rng.random_range(0.15..1.0)));
            targets.push(i);
            targets.push(j);
        }
    }
    for v in init..n {
        let mut chosen: Vec<usize> = Vec::with_capacity(m);
        while chosen.len() < m {
            let u = targets[rng.random_range(0..targets.len())];
            if !chosen.contains(&u) {
                chosen.push(u);
            }
        }
        for u in chosen {
            edges.push((format!("p{u}"), format!("p{v}"), rng.random_range(0.15..1.0)));
            targets.push(u);
            targets.push(v);
        }
    }
    Graph::from_edges(edges).expect("non-empty graph")
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");
    for &n in &[1_000usize, 10_000] {
        let g = barabasi_albert(n, 4, 7);
        let seeds: Vec<String> = (0..20).map(|i| format!("p{}", i * (n / 20))).collect();
        let s = build_start(&g, &seeds).unwrap();

        group.bench_with_input(BenchmarkId::new("rwr", n), &n, |b, _| {
            let m = RandomWalkWithRestart::new(0.4);
            b.iter(|| black_box(m.run(&g, &s).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("ppr", n), &n, |b, _| {
            let m = PersonalizedPageRank::new(0.4);
            b.iter(|| black_box(m.run(&g, &(&s).into()).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("dk", n), &n, |b, _| {
            let m = DiffusionKernel::new(0.5);
            b.iter(|| black_box(m.run(&g, &s).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("rank", n), &n, |b, _| {
            let scores = RandomWalkWithRestart::new(0.4).run(&g, &s).unwrap().scores;
            b.iter(|| black_box(rank(&scores, &g).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_methods);
criterion_main!(benches);
