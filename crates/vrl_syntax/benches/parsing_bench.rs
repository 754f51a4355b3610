use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use vrl_syntax::lexer::Lexer;
use vrl_syntax::testing::{ambiguous_language, statements_language, vrl_language, SourceGenerator};
use vrl_syntax::{parse, reparse, Edit, Language};

fn bench_full_parse(c: &mut Criterion) {
    let language = statements_language();
    let mut group = c.benchmark_group("full_parse");
    for statements in [10, 100, 1000] {
        let text = SourceGenerator::new(42).program(statements);
        group.bench_with_input(BenchmarkId::from_parameter(statements), &text, |b, text| {
            b.iter(|| black_box(parse(black_box(text), &language)));
        });
    }
    group.finish();
}

fn bench_incremental_parse(c: &mut Criterion) {
    let language = statements_language();
    let text = SourceGenerator::new(42).program(1000);
    let prior = parse(&text, &language).unwrap();
    let middle = text.len() / 2;
    let at = text[middle..].find('\n').map_or(middle, |index| middle + index + 1);
    let (edit, edited) = Edit::from_change(&text, at..at, "let inserted;\n");

    c.bench_function("reparse_insert_statement", |b| {
        b.iter(|| black_box(reparse(&prior, black_box(edit), &edited)));
    });

    let (rename, renamed) = Edit::from_change(&text, 4..5, "zz");
    c.bench_function("reparse_edit_near_start", |b| {
        b.iter(|| black_box(reparse(&prior, black_box(rename), &renamed)));
    });
}

fn bench_vrl_parse(c: &mut Criterion) {
    let language = vrl_language();
    let text: String = (0..1000)
        .map(|line| format!("field_{line} ?? (count || {line}) + 1 # default\n"))
        .collect();
    c.bench_function("vrl_1000_lines", |b| {
        b.iter(|| black_box(parse(black_box(&text), &language)));
    });
}

fn bench_lexer(c: &mut Criterion) {
    let language = statements_language();
    let text = SourceGenerator::new(7).program(1000);
    c.bench_function("tokenize_1000_statements", |b| {
        b.iter(|| black_box(Lexer::new(&language).tokenize(black_box(&text))));
    });
}

fn bench_ambiguity(c: &mut Criterion) {
    let language = ambiguous_language();
    let text = vec!["x"; 64].join(" ");
    c.bench_function("ambiguous_64_terms", |b| {
        b.iter(|| black_box(parse(black_box(&text), &language)));
    });
}

fn bench_artifact_load(c: &mut Criterion) {
    let bytes = statements_language().to_bytes();
    c.bench_function("artifact_load", |b| {
        b.iter(|| black_box(Language::load(black_box(&bytes))));
    });
}

criterion_group!(
    benches,
    bench_full_parse,
    bench_incremental_parse,
    bench_vrl_parse,
    bench_lexer,
    bench_ambiguity,
    bench_artifact_load
);
criterion_main!(benches);
