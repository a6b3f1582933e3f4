use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mail_archive_etl::decoder::html_to_text;
use mail_archive_etl::extractor::FieldExtractor;

const TRANSCRIPT: &str = "Message ID: 8d798677-9a33-47d1-876c-a0efe27a7222\n\
2025-09-14T05:19:14.864688Z Bob Demo - bob@example.com says:\n\
Hello team, please find attached the report.\n\
Numbers are up on last week.";

fn bench_extract(c: &mut Criterion) {
    let extractor = FieldExtractor::new();
    c.bench_function("extract_all_fields", |b| {
        b.iter(|| extractor.extract(black_box(TRANSCRIPT)));
    });

    let long_body = format!("{TRANSCRIPT}\n{}", "more text on another line\n".repeat(500));
    c.bench_function("extract_long_body", |b| {
        b.iter(|| extractor.extract(black_box(&long_body)));
    });
}

fn bench_html(c: &mut Criterion) {
    let html = format!(
        "<html><head><style>p {{ color: red }}</style></head><body><p>{}</p></body></html>",
        TRANSCRIPT.replace('\n', "<br>")
    );
    c.bench_function("html_to_text", |b| b.iter(|| html_to_text(black_box(&html))));
}

criterion_group!(benches, bench_extract, bench_html);
criterion_main!(benches);
