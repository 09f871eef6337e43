//! Rollback throughput on a three-level bidding tree.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dtree_core::payoff::{PathContext, PayoffFn};
use dtree_core::registry::{Branch, OptimizeSense, Registry};
use dtree_engine::{DecisionTree, RollbackConfig};

fn bid_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .decision(
            "bid",
            vec![
                Branch::decision("low", 500.0, "compbid"),
                Branch::decision("high", 700.0, "compbid"),
            ],
            OptimizeSense::Maximize,
        )
        .unwrap();
    registry
        .chance(
            "compbid",
            vec![
                Branch::chance("low", 0.35, 400.0, "cost"),
                Branch::chance("medium", 0.50, 600.0, "cost"),
                Branch::chance("high", 0.15, 800.0, "cost"),
            ],
        )
        .unwrap();
    registry
        .chance(
            "cost",
            vec![
                Branch::chance("low", 0.25, 200.0, "profit"),
                Branch::chance("medium", 0.50, 400.0, "profit"),
                Branch::chance("high", 0.25, 600.0, "profit"),
            ],
        )
        .unwrap();
    registry.terminal(
        "profit",
        Some(PayoffFn::new(|context: &PathContext| {
            let bid = context.value("bid").unwrap_or(0.0);
            let compbid = context.value("compbid").unwrap_or(0.0);
            let cost = context.value("cost").unwrap_or(0.0);
            if bid < compbid {
                bid - cost
            } else {
                0.0
            }
        })),
    );
    registry
}

fn bench_build(c: &mut Criterion) {
    let registry = bid_registry();
    c.bench_function("tree_build", |b| {
        b.iter(|| DecisionTree::new(black_box(&registry), "bid").unwrap())
    });
}

fn bench_rollback(c: &mut Criterion) {
    let registry = bid_registry();
    let mut tree = DecisionTree::new(&registry, "bid").unwrap();
    let config = RollbackConfig::default();
    c.bench_function("evaluate_and_rollback", |b| {
        b.iter(|| {
            tree.evaluate();
            black_box(tree.rollback(&config).unwrap())
        })
    });
}

fn bench_probabilistic_sweep(c: &mut Criterion) {
    let registry = bid_registry();
    let mut tree = DecisionTree::new(&registry, "bid").unwrap();
    tree.evaluate();
    tree.rollback(&RollbackConfig::default()).unwrap();
    c.bench_function("probabilistic_sweep", |b| {
        b.iter(|| black_box(tree.probabilistic_sensitivity("cost").unwrap()))
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_rollback,
    bench_probabilistic_sweep
);
criterion_main!(benches);
