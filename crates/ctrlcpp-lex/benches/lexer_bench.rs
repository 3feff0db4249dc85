use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ctrlcpp_lex::scanner::scan;
use ctrlcpp_lex::token::TokenStream;
use ctrlcpp_util::diagnostics::Diagnostics;
use ctrlcpp_util::location::FileId;

fn sample_source(lines: usize) -> String {
    let mut src = String::new();
    for i in 0..lines {
        src.push_str(&format!(
            "global int counter_{i} = {i}; // running total\n"
        ));
    }
    src
}

fn bench_scan(c: &mut Criterion) {
    let source = sample_source(2000);
    c.bench_function("scan_2000_lines", |b| {
        b.iter(|| {
            let mut tokens = TokenStream::new();
            let mut diags = Diagnostics::new();
            scan(FileId::new(0), black_box(&source), &mut tokens, &mut diags);
            black_box(tokens.len())
        })
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
