use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use varwise_view::core::Scalar;
use varwise_view::querying::{CatalogQuery, PageRequest, SortDirection, SortSpec};
use varwise_view::storage::CatalogTable;

/// Synthetic catalog with a few numeric columns, a text column and some
/// missing magnitudes.
fn synthetic_catalog(rows: usize) -> CatalogTable {
    let columns = vec![
        "cluster_id".to_string(),
        "Designation".to_string(),
        "w1mag".to_string(),
        "w2mag".to_string(),
        "period_peak_1".to_string(),
    ];
    let data = (0..rows)
        .map(|i| {
            let w1 = if i % 17 == 0 { Scalar::Null } else { Scalar::Float(12.0 + (i % 500) as f64 / 100.0) };
            vec![
                Scalar::Int(((i % 4) as i64) << 48 | i as i64),
                Scalar::Text(format!("WISEA J{:06}", i)),
                w1,
                Scalar::Float(11.0 + (i % 300) as f64 / 100.0),
                Scalar::Float((i % 1000) as f64 * 1.5),
            ]
        })
        .collect();
    CatalogTable::from_rows(columns, data).expect("valid synthetic catalog")
}

fn bench_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_page");
    for rows in [10_000usize, 100_000] {
        let table = synthetic_catalog(rows);

        let filtered = PageRequest {
            filter: Some("w1mag>14, w2mag<=13.5, period_peak_1!=0".to_string()),
            sort: Some(SortSpec { column: "w1mag".to_string(), direction: SortDirection::Desc }),
            offset: 40,
            limit: 20,
        };
        group.bench_with_input(BenchmarkId::new("filter_sort_slice", rows), &filtered, |b, req| {
            b.iter(|| CatalogQuery::page(black_box(&table), black_box(req)).map(|p| p.rows.len()))
        });

        let text_sort = PageRequest {
            sort: Some(SortSpec { column: "Designation".to_string(), direction: SortDirection::Asc }),
            limit: 20,
            ..PageRequest::default()
        };
        group.bench_with_input(BenchmarkId::new("text_sort", rows), &text_sort, |b, req| {
            b.iter(|| CatalogQuery::page(black_box(&table), black_box(req)).map(|p| p.rows.len()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_page);
criterion_main!(benches);
