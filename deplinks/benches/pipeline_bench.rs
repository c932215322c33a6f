//! Benchmarks for link extraction and the per-project processing path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deplinks::prelude::*;
use std::sync::Arc;

const SNIPPET: &str = "rumba.url=https://rumba.savvas.com/sso\n\
                       config.url=https://config.savvasdev.com/api/v2\n\
                       <url>https://gateway.savvas.com/sapi/users</url>\n\
                       npm=https://registry.npmjs.org/";

fn records(n: usize) -> Vec<SearchResultRecord> {
    (0..n)
        .map(|i| {
            SearchResultRecord::new("REAL", format!("repo-{}", i % 7), "conf/", format!("app-{i}.properties"))
                .with_snippet(SNIPPET)
        })
        .collect()
}

fn extract_benchmark(c: &mut Criterion) {
    c.bench_function("extract_links", |b| {
        b.iter(|| extract_links(black_box(SNIPPET)).count());
    });

    let classifier = UrlClassifier::default();
    c.bench_function("classify_snippet", |b| {
        b.iter(|| {
            extract_links(black_box(SNIPPET))
                .map(|m| classifier.classify(&m))
                .count()
        });
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let pipeline = DependencyPipeline::new(
        ScanConfig::default(),
        Arc::new(InMemorySource::new()),
        Arc::new(CollectingSink::new()),
    );
    let input = records(500);
    c.bench_function("process_500_results", |b| {
        b.iter(|| pipeline.process(black_box(&input)));
    });
}

criterion_group!(benches, extract_benchmark, pipeline_benchmark);
criterion_main!(benches);
