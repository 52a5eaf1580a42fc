use criterion::{Criterion, criterion_group, criterion_main};
use kootopia_engine::compile::map_diagnostics;
mod common;

fn bench_diagnostic_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagnostics");

    let source = common::generate_kotlin_source(200);
    let output = common::generate_compiler_output(50);

    group.bench_function("map_compiler_output", |b| {
        b.iter(|| {
            let lines = map_diagnostics(
                std::hint::black_box(&output),
                std::hint::black_box(&source),
            );
            std::hint::black_box(lines);
        });
    });

    group.bench_function("map_clean_output", |b| {
        b.iter(|| {
            let lines = map_diagnostics(std::hint::black_box("Hello, world!"), &source);
            std::hint::black_box(lines);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_diagnostic_mapping);
criterion_main!(benches);
