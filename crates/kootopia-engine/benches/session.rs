use criterion::{Criterion, criterion_group, criterion_main};
use kootopia_engine::editing::{Cmd, Document, EditSession};
mod common;

fn bench_session_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    group.sample_size(10);

    let content = common::generate_kotlin_source(500);

    group.bench_function("keystroke_burst_then_commit", |b| {
        b.iter(|| {
            let mut session = EditSession::new(&content);
            let mut text = content.clone();
            for ch in "val typed = 42".chars() {
                text.push(ch);
                session.edit(&text, text.len()..text.len());
            }
            session.commit();
            std::hint::black_box(session.history().undo_len());
        });
    });

    group.bench_function("replace_all", |b| {
        let doc = Document::from_text(&content);
        b.iter(|| {
            let cmd = Cmd::ReplaceAll {
                find: std::hint::black_box("helper".to_string()),
                replacement: std::hint::black_box("worker".to_string()),
            };
            std::hint::black_box(doc.apply(&cmd));
        });
    });

    group.bench_function("undo_redo_cycle", |b| {
        let mut session = EditSession::new("");
        for i in 0..200 {
            session.edit(&content[..i * 10], 0..0);
            session.commit();
        }
        b.iter(|| {
            while session.undo() {}
            while session.redo() {}
        });
    });

    group.finish();
}

criterion_group!(benches, bench_session_operations);
criterion_main!(benches);
