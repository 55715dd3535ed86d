//! Benchmarks for tokenization and content-stream parsing.
//!
//! Benchmark groups:
//! - `lexer_tokenize`: raw `Lexer` throughput at various scales
//! - `lexer_token_types`: strings and numbers in isolation
//! - `content_parse`: `parse_ops` over page-shaped content, inline images included

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use pdfprobe_core::parser::{parse_ops, Lexer};

// =============================================================================
// Data Generation
// =============================================================================

/// Content-stream text cycling through common text and graphics operators.
fn generate_page_content(n: usize) -> Vec<u8> {
    let templates: &[&[u8]] = &[
        b"BT ",
        b"/F1 12 Tf ",
        b"72 700 Td ",
        b"(Hello World) Tj ",
        b"[(Kern) -120 (ed)] TJ ",
        b"ET ",
        b"q ",
        b"1 0 0 1 72 720 cm ",
        b"0.5 0.25 0 rg ",
        b"<48454C4C4F> Tj ",
        b"/Im1 Do ",
        b"Q ",
    ];
    let mut data = Vec::with_capacity(n * 12);
    for i in 0..n {
        data.extend_from_slice(templates[i % templates.len()]);
    }
    data
}

fn generate_numbers(n: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(n * 8);
    for i in 0..n {
        let value = match i % 4 {
            0 => format!("{} ", i % 1000),
            1 => format!("-{}.{} ", i % 50, (i * 3) % 100),
            2 => format!(".{} ", (i % 99) + 1),
            _ => format!("{} ", (i % 10000) * 100),
        };
        data.extend_from_slice(value.as_bytes());
    }
    data
}

fn generate_strings(n: usize) -> Vec<u8> {
    let strings: &[&[u8]] = &[
        b"(Plain) ",
        b"(Nested (parens) here) ",
        b"(Escaped \\) paren) ",
        b"(Octal\\101\\102) ",
        b"<DEADBEEF> ",
        b"<4 8 4 5> ",
    ];
    let mut data = Vec::with_capacity(n * 16);
    for i in 0..n {
        data.extend_from_slice(strings[i % strings.len()]);
    }
    data
}

/// Content with an inline image every `every` operations.
fn generate_inline_images(n: usize, every: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(n * 20);
    for i in 0..n {
        if i % every == 0 {
            data.extend_from_slice(b"BI /W 8 /H 8 /BPC 8 /CS /G ID ");
            data.extend((0..64u8).map(|b| b.wrapping_mul(37)));
            data.extend_from_slice(b" EI ");
        } else {
            data.extend_from_slice(b"0 0 m 10 10 l S ");
        }
    }
    data
}

fn count_tokens(data: &[u8]) -> usize {
    Lexer::new(data).count()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_tokenize");

    for ops in [1_000usize, 10_000, 100_000] {
        let data = generate_page_content(ops);
        let tokens = count_tokens(&data);
        group.bench_with_input(BenchmarkId::new("page_content", tokens), &data, |b, data| {
            b.iter(|| Lexer::new(black_box(data)).map(black_box).count())
        });
    }

    group.finish();
}

fn bench_token_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_token_types");
    let n = 100_000;

    let numbers = generate_numbers(n);
    group.bench_with_input(BenchmarkId::new("numbers", n), &numbers, |b, data| {
        b.iter(|| Lexer::new(black_box(data)).map(black_box).count())
    });

    let strings = generate_strings(n);
    group.bench_with_input(BenchmarkId::new("strings", n), &strings, |b, data| {
        b.iter(|| Lexer::new(black_box(data)).map(black_box).count())
    });

    group.finish();
}

fn bench_content_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_parse");

    for ops in [1_000usize, 10_000, 100_000] {
        let data = generate_page_content(ops);
        group.bench_with_input(BenchmarkId::new("page_content", ops), &data, |b, data| {
            b.iter(|| parse_ops(black_box(data), usize::MAX).len())
        });
    }

    let data = generate_inline_images(10_000, 50);
    group.bench_with_input(BenchmarkId::new("inline_images", 10_000), &data, |b, data| {
        b.iter(|| parse_ops(black_box(data), usize::MAX).len())
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_token_types, bench_content_parse);
criterion_main!(benches);
