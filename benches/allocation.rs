//! Allocation benchmarks: tree build, projection, and plan computation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pinwheel::{
    AllocationTable, AllocationTree, BalanceRecord, BalanceTable, Goal, NodeDescriptor,
    RebalancingEngine,
};

/// Generate a three-level descriptor with `fanout` children per node.
///
/// Weights come from a simple deterministic RNG so siblings are unnormalized.
fn generate_descriptor(fanout: usize) -> NodeDescriptor {
    // Simple deterministic PRNG (xorshift32)
    let mut rng_state: u32 = 42;
    let mut next_weight = move || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 17;
        rng_state ^= rng_state << 5;
        (rng_state % 100 + 1) as f64
    };

    let mut root = NodeDescriptor::root("Portfolio", "Bench");
    for i in 0..fanout {
        let mut class = NodeDescriptor::new("Asset Class", format!("C{i:03}"), next_weight());
        for j in 0..fanout {
            let mut style = NodeDescriptor::new("Asset Style", format!("S{j:03}"), next_weight());
            for k in 0..fanout {
                style = style.with_child(NodeDescriptor::new(
                    "Ticker",
                    format!("T{i:03}{j:03}{k:03}"),
                    next_weight(),
                ));
            }
            class = class.with_child(style);
        }
        root = root.with_child(class);
    }
    root
}

/// Benchmark: build + normalize at increasing fanout
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/build");

    for fanout in [4, 10, 20] {
        let desc = generate_descriptor(fanout);
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &desc, |b, desc| {
            b.iter(|| black_box(AllocationTree::build(desc).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: flatten a built tree
fn bench_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/project");

    for fanout in [4, 10, 20] {
        let tree = AllocationTree::build(&generate_descriptor(fanout)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &tree, |b, tree| {
            b.iter(|| black_box(AllocationTable::project(tree)));
        });
    }

    group.finish();
}

/// Benchmark: outer join + contributions (8000 leaves, every other one held twice)
fn bench_plan(c: &mut Criterion) {
    let tree = AllocationTree::build(&generate_descriptor(20)).unwrap();
    let table = AllocationTable::project(&tree);
    let records = table
        .rows()
        .iter()
        .step_by(2)
        .flat_map(|r| {
            [
                BalanceRecord::new(r.path.clone(), 1_000.0),
                BalanceRecord::new(r.path.clone(), 250.0),
            ]
        })
        .collect();
    let balances = BalanceTable::new(table.schema().clone(), records).unwrap();
    let engine = RebalancingEngine::new(Goal::new(1_000_000.0, 120));

    c.bench_function("rebalance/plan_8000_leaves", |b| {
        b.iter(|| black_box(engine.plan(&table, &balances).unwrap()));
    });
}

criterion_group!(benches, bench_build, bench_project, bench_plan);
criterion_main!(benches);
