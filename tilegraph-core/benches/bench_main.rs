use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::{Coord, LineString};
use tilegraph_core::prelude::*;

fn grid_tile(n: usize) -> TileBuilder {
    let mut builder = TileBuilder::new(TileConfig::default());
    for i in 0..n {
        for j in 0..n - 1 {
            let (a, b, c) = (j as f64 * 100.0, (j + 1) as f64 * 100.0, i as f64 * 100.0);
            let mut row = StreetSegment::new(LineString::new(vec![
                Coord { x: a, y: c },
                Coord { x: b, y: c },
            ]));
            row.base.names.push(Name::official("en", format!("Row {i}")));
            let column = StreetSegment::new(LineString::new(vec![
                Coord { x: c, y: a },
                Coord { x: c, y: b },
            ]));
            builder.add_feature(row).unwrap();
            builder.add_feature(column).unwrap();
        }
    }
    builder
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_grid");
    for n in [10, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || grid_tile(n),
                |mut builder| black_box(builder.compile().map(|s| s.islands)),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_radius_query(c: &mut Criterion) {
    let mut builder = grid_tile(30);
    builder.rebuild_index();
    c.bench_function("radius_query", |b| {
        b.iter(|| {
            builder.index().query_within_radius(
                builder.store(),
                black_box(Coord { x: 1500.0, y: 1500.0 }),
                2.0,
                TypeFilter::ROUTEABLE,
            )
        });
    });
}

criterion_group!(benches, bench_compile, bench_radius_query);
criterion_main!(benches);
