use criterion::{Criterion, criterion_group, criterion_main};
use magcore::{
    data::RawCell,
    index::{RowIndex, normalize_identifier},
    session::Session,
    source::{MemorySource, RawTable},
};

fn generate_cores(rows: usize) -> RawTable {
    let families = ["E", "EE", "ETD", "RM", "P", "PQ", "EP"];
    RawTable {
        headers: vec![
            "Core Type".to_string(),
            "A_c,e [mm^2]".to_string(),
            "A_w [mm^2]".to_string(),
            "A_c,min [mm^2|".to_string(),
            "l_t [mm]".to_string(),
        ],
        rows: (0..rows)
            .map(|i| {
                let family = families[i % families.len()];
                vec![
                    RawCell::Text(format!("{family} {i}")),
                    RawCell::Number(10.0 + i as f64),
                    RawCell::Number(5.0 + (i % 13) as f64),
                    RawCell::Number(8.0 + (i % 7) as f64),
                    RawCell::Number((i % 5) as f64),
                ]
            })
            .collect(),
    }
}

fn bench_resolution(c: &mut Criterion) {
    let table = generate_cores(5_000);
    let identifiers = table
        .rows
        .iter()
        .map(|row| row[0].as_text())
        .collect::<Vec<_>>();
    let index = RowIndex::build(&identifiers);
    let needle = "rm 4994";

    let mut group = c.benchmark_group("resolve");
    group.bench_function("row_index", |b| {
        b.iter(|| index.resolve(std::hint::black_box(needle)))
    });
    group.bench_function("linear_scan", |b| {
        b.iter(|| {
            let wanted = normalize_identifier(std::hint::black_box(needle));
            identifiers
                .iter()
                .position(|identifier| normalize_identifier(identifier) == wanted)
        })
    });
    group.finish();

    let session = Session::load(Box::new(MemorySource::new("bench", table))).expect("load");
    c.bench_function("query_with_metrics", |b| {
        b.iter(|| session.query(std::hint::black_box(needle)).expect("resolves"))
    });
}

criterion_group!(benches, bench_resolution);
criterion_main!(benches);
