//! Criterion benchmarks for history parsing.
//!
//! Run with: `cargo bench`
//!
//! Streams are synthetic `git log --shortstat` output so results are
//! reproducible across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;

use sentinel::parser::{LineClass, LineClassifier, ShortStatClassifier, parse_log_stream};

// ─── Helpers ─────────────────────────────────────────────────────────

/// Build a stream of `num_commits` commits; every fifth one is a merge with no
/// stats line, like a typical merge-heavy history.
fn synthetic_log(num_commits: usize) -> String {
    let mut out = String::with_capacity(num_commits * 160);
    for i in 0..num_commits {
        out.push_str(&format!(
            "\u{1e}dev{}@example.com\u{1f}{}\u{1f}Change-number-{}\u{1f}{:07x}\u{1f}",
            i % 37,
            1_600_000_000 + i as i64 * 60,
            i,
            i
        ));
        out.push('\n');
        if i % 5 != 0 {
            out.push_str(&format!(
                " {} files changed, {} insertions(+), {} deletions(-)\n\n",
                i % 9 + 1,
                i % 200 + 1,
                i % 50
            ));
        }
    }
    out
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_parse_stream(c: &mut Criterion) {
    let classifier = ShortStatClassifier::new();
    let mut group = c.benchmark_group("parse_log_stream");

    for num_commits in [1_000usize, 10_000, 100_000] {
        let log = synthetic_log(num_commits);
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_commits), &log, |b, log| {
            b.iter(|| {
                let commits =
                    parse_log_stream(Cursor::new(log.as_bytes()), "bench", &classifier).unwrap();
                black_box(commits.len());
            })
        });
    }

    group.finish();
}

fn bench_classify_line(c: &mut Criterion) {
    let classifier = ShortStatClassifier::new();
    let header = "\u{1e}dev@example.com\u{1f}1700000000\u{1f}Fix-parser\u{1f}abc1234\u{1f}HEAD -> main";
    let stats = " 3 files changed, 120 insertions(+), 14 deletions(-)";
    let mut group = c.benchmark_group("classify");

    group.bench_function("header", |b| {
        b.iter(|| black_box(matches!(classifier.classify(black_box(header)), LineClass::Header(_))))
    });
    group.bench_function("stats", |b| {
        b.iter(|| black_box(matches!(classifier.classify(black_box(stats)), LineClass::Stats(_))))
    });
    group.bench_function("blank", |b| {
        b.iter(|| black_box(matches!(classifier.classify(black_box("")), LineClass::Noise)))
    });

    group.finish();
}

criterion_group!(benches, bench_parse_stream, bench_classify_line);
criterion_main!(benches);
