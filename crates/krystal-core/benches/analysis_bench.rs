//! # Analysis Benchmarks
//!
//! Performance benchmarks for krystal-core network analysis.
//!
//! Run with: `cargo bench -p krystal-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use krystal_core::centrality::{betweenness_centrality, closeness_centrality};
use krystal_core::community::louvain_communities;
use krystal_core::primitives::LOUVAIN_RESOLUTION;
use krystal_core::{
    Entity, EntityId, EntityKind, NetworkSnapshot, PowerMapper, Relationship, export_canonical,
};
use std::hint::black_box;

fn entities(size: u64) -> Vec<Entity> {
    (0..size)
        .map(|i| Entity::new(i, format!("Entity {}", i), EntityKind::Corporation))
        .collect()
}

/// Consecutive entities connected in a line.
fn linear_network(size: u64) -> (Vec<Entity>, Vec<Relationship>) {
    let rels = (1..size)
        .map(|i| Relationship::new(i - 1, i, "link", 0.5))
        .collect();
    (entities(size), rels)
}

/// Entity 0 connected to every other entity.
fn star_network(size: u64) -> (Vec<Entity>, Vec<Relationship>) {
    let rels = (1..size)
        .map(|i| Relationship::new(0u64, i, "link", 0.5))
        .collect();
    (entities(size), rels)
}

/// Cliques of five joined in a chain.
fn clustered_network(size: u64) -> (Vec<Entity>, Vec<Relationship>) {
    let mut rels = Vec::new();
    for base in (0..size).step_by(5) {
        let end = (base + 5).min(size);
        for a in base..end {
            for b in (a + 1)..end {
                rels.push(Relationship::new(a, b, "member", 0.8));
            }
        }
        if base + 5 < size {
            rels.push(Relationship::new(base, base + 5, "bridge", 0.4));
        }
    }
    (entities(size), rels)
}

fn loaded(network: &(Vec<Entity>, Vec<Relationship>)) -> PowerMapper {
    let mut mapper = PowerMapper::default();
    mapper
        .load_network(&network.0, &network.1)
        .expect("load network");
    mapper
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_analysis");

    for size in [50u64, 200].iter() {
        let network = clustered_network(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &network, |b, network| {
            b.iter(|| {
                let mut mapper = PowerMapper::default();
                black_box(mapper.analyze_network(&network.0, &network.1))
            });
        });
    }

    group.finish();
}

fn bench_betweenness(c: &mut Criterion) {
    let mut group = c.benchmark_group("betweenness");

    for size in [50u64, 200, 500].iter() {
        let line = loaded(&linear_network(*size));
        let star = loaded(&star_network(*size));

        group.bench_with_input(BenchmarkId::new("linear", size), size, |b, _| {
            b.iter(|| black_box(betweenness_centrality(line.graph())));
        });
        group.bench_with_input(BenchmarkId::new("star", size), size, |b, _| {
            b.iter(|| black_box(betweenness_centrality(star.graph())));
        });
    }

    group.finish();
}

fn bench_closeness(c: &mut Criterion) {
    let mut group = c.benchmark_group("closeness");

    for size in [50u64, 200, 500].iter() {
        let mapper = loaded(&linear_network(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(closeness_centrality(mapper.graph())));
        });
    }

    group.finish();
}

fn bench_louvain(c: &mut Criterion) {
    let mut group = c.benchmark_group("louvain");

    for size in [50u64, 200, 500].iter() {
        let mapper = loaded(&clustered_network(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(louvain_communities(mapper.graph(), LOUVAIN_RESOLUTION)));
        });
    }

    group.finish();
}

fn bench_connection_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection_paths");

    for size in [50u64, 200].iter() {
        let mapper = loaded(&clustered_network(*size));
        let from = EntityId::from(0u64);
        let to = EntityId::from(9u64);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(mapper.find_connection_paths(&from, &to, 5)));
        });
    }

    group.finish();
}

fn bench_export_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_canonical");

    for size in [100u64, 500, 1000].iter() {
        let (ents, rels) = clustered_network(*size);
        let snapshot = NetworkSnapshot::new(ents, rels);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(export_canonical(&snapshot)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_analysis,
    bench_betweenness,
    bench_closeness,
    bench_louvain,
    bench_connection_paths,
    bench_export_canonical,
);
criterion_main!(benches);
