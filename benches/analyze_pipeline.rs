use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use terminal_insights::{
    advisor::suggest_chart_type,
    chart::{ChartRequest, build_spec},
    data::Dataset,
    io_utils::{self, LoadOptions},
    mock,
    schema::classify,
    traffic::TrafficAnalyzer,
};
use tempfile::TempDir;

fn shipments(rows: usize) -> Dataset {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
    mock::generate(rows, 7, base)
}

fn write_shipments(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("shipments.json");
    let contents = serde_json::to_string(&shipments(rows)).expect("serialize shipments");
    fs::write(&path, contents).expect("write shipments");
    (temp_dir, path)
}

fn bench_analyze_pipeline(c: &mut Criterion) {
    let dataset = shipments(10_000);
    let analyzer = TrafficAnalyzer::default();
    let (temp_dir, path) = write_shipments(10_000);

    let mut group = c.benchmark_group("analyze_pipeline");

    group.bench_function("classify_and_chart", |b| {
        b.iter(|| {
            let chart_type = suggest_chart_type(&classify(&dataset)).chart_type;
            build_spec(&dataset, &ChartRequest::new(chart_type))
        });
    });

    group.bench_function("traffic_analysis", |b| {
        b.iter(|| analyzer.analyze(&dataset));
    });

    group.bench_function("load_and_analyze", |b| {
        b.iter_batched(
            || (),
            |_| {
                let response =
                    io_utils::load_payload(&path, &LoadOptions::default()).expect("load shipments");
                analyzer.analyze(&response.dataset)
            },
            BatchSize::SmallInput,
        );
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_analyze_pipeline);
criterion_main!(benches);
