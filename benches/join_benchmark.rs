use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use reldb::bench::{JoinBenchmark, generate_relation};
use reldb::{Algorithm, Catalog, ColumnRef, Index, IndexKind, Interpreter, JoinContext, PlanConfig, Value};
use std::hint::black_box;

fn bench_join_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Equi_Join");
    let condition = JoinBenchmark::condition();

    for n in [1000, 5000].iter() {
        let setup = JoinBenchmark {
            max_value: *n as i64 / 10,
            ..JoinBenchmark::default()
        };
        let (left, right) = setup.inputs(*n).unwrap();
        for algorithm in [Algorithm::Hash, Algorithm::SortMerge, Algorithm::BlockNestedLoop] {
            group.bench_with_input(BenchmarkId::new(algorithm.to_string(), n), n, |b, _| {
                let context = JoinContext::new(&left, &right, &condition);
                b.iter(|| black_box(context.execute(algorithm).unwrap()));
            });
        }
    }
    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("Index_Build");
    let key = [ColumnRef::new("k")];

    for n in [10000, 100000].iter() {
        let relation = generate_relation("t", &["k", "v"], *n, 1000, 42).unwrap();
        for kind in [IndexKind::Hash, IndexKind::Ordered] {
            group.bench_with_input(BenchmarkId::new(kind.to_string(), n), n, |b, _| {
                b.iter(|| black_box(Index::build(&relation, &key, kind).unwrap()));
            });
        }
    }
    group.finish();
}

fn bench_index_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("Index_Lookup");
    let relation = generate_relation("t", &["k", "v"], 100000, 1000, 42).unwrap();
    let key = [ColumnRef::new("k")];

    for kind in [IndexKind::Hash, IndexKind::Ordered] {
        let index = Index::build(&relation, &key, kind).unwrap();
        group.bench_function(kind.to_string(), |b| {
            b.iter(|| black_box(index.lookup(black_box(&[Value::Int(500)])).unwrap().len()));
        });
    }
    group.finish();
}

fn bench_query_index_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("Select_Where_Performance");
    let mut catalog = Catalog::new();
    catalog.register(generate_relation("t", &["k", "v"], 100000, 1000, 42).unwrap());
    catalog
        .create_index("t", &[ColumnRef::new("k")], IndexKind::Ordered)
        .unwrap();

    for index_selection in [false, true] {
        let config = PlanConfig {
            index_selection,
            ..PlanConfig::default()
        };
        let interpreter = Interpreter::new(&catalog, config);
        let name = if index_selection { "index" } else { "scan" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let res = interpreter
                    .query("SELECT v FROM t WHERE k >= 100 AND k < 110")
                    .unwrap();
                black_box(res);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_join_algorithms,
    bench_index_build,
    bench_index_lookup,
    bench_query_index_selection
);
criterion_main!(benches);
