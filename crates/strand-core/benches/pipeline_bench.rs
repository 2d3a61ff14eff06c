//! # Pipeline Benchmarks
//!
//! Indexing and traversal cost for strand-core.
//!
//! Run with: `cargo bench -p strand-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use strand_core::{
    ContextOptions, Edge, EdgeIndex, ExecuteOptions, GraphEngine, PathOptions, ProvenanceContext,
    EdgeFact,
};

/// A chain n0 -> n1 -> ... -> n{size-1}.
fn linear_edges(size: usize) -> Vec<Edge> {
    (1..size)
        .map(|i| Edge::new(format!("e{i}"), format!("n{}", i - 1), format!("n{i}"), "next"))
        .collect()
}

/// A grid where every node links right and down, giving many paths.
fn grid_engine(side: usize) -> GraphEngine {
    let engine = GraphEngine::new();
    for row in 0..side {
        for col in 0..side {
            let here = format!("g{row}_{col}");
            if col + 1 < side {
                let _ = engine.add_edge(
                    EdgeFact::new(here.as_str(), format!("g{row}_{}", col + 1), "link"),
                    None,
                    ProvenanceContext::default(),
                    None,
                );
            }
            if row + 1 < side {
                let _ = engine.add_edge(
                    EdgeFact::new(here.as_str(), format!("g{}_{col}", row + 1), "link"),
                    None,
                    ProvenanceContext::default(),
                    None,
                );
            }
        }
    }
    engine
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_indexing");

    for size in [100, 1000, 10000] {
        let edges = linear_edges(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &edges, |b, edges| {
            b.iter(|| {
                let mut index = EdgeIndex::new();
                for edge in edges {
                    index.index_edge(edge.clone());
                }
                black_box(index)
            });
        });
    }

    group.finish();
}

fn bench_find_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_paths_grid");

    for side in [4, 6, 8] {
        let engine = grid_engine(side);
        let target = format!("g{}_{}", side - 1, side - 1);
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, &side| {
            b.iter(|| {
                let result = engine.find_paths(
                    "g0_0",
                    target.as_str(),
                    PathOptions {
                        max_depth: Some(2 * (side - 1)),
                        shortest: true,
                        ..PathOptions::default()
                    },
                );
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_neighbourhood(c: &mut Criterion) {
    let engine = grid_engine(10);
    let pipeline = engine
        .parse_pipeline(serde_json::json!([
            {"op": "REC", "params": {"until": {"maxDepth": 4, "fixedPoint": true}, "collect": "nodes"}},
            {"op": "SYN", "params": {"mode": "count"}}
        ]))
        .expect("pipeline");

    c.bench_function("rec_nodes_depth4", |b| {
        b.iter(|| black_box(engine.execute(&pipeline, ExecuteOptions::starting_at(["g0_0"]))));
    });

    c.bench_function("find_within_hops_3", |b| {
        b.iter(|| {
            black_box(engine.find_within_hops(
                "g0_0",
                3,
                PathOptions::default(),
                ContextOptions::default(),
            ))
        });
    });
}

criterion_group!(benches, bench_indexing, bench_find_paths, bench_neighbourhood);
criterion_main!(benches);
