use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lumen_core::{DomTree, Readability, fingerprint, parse_feed, preprocess_html};

fn article_page() -> String {
    std::fs::read_to_string("tests/fixtures/pages/cranes.html").unwrap()
}

/// The fixture page with its article body repeated `n` times.
fn long_page(n: usize) -> String {
    let page = article_page();
    let start = page.find("<article").unwrap();
    let end = page.find("</article>").unwrap() + "</article>".len();
    let body = page[start..end].repeat(n);
    format!("{}{}{}", &page[..start], body, &page[end..])
}

fn bench_dom_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("dom_tree");

    for n in [1, 10, 100] {
        let html = long_page(n);
        group.bench_with_input(BenchmarkId::new("from_html", n), &html, |b, html| {
            b.iter(|| DomTree::from_html(black_box(html)))
        });
    }

    group.finish();
}

fn bench_readability(c: &mut Criterion) {
    let html = article_page();
    let readability = Readability::new();

    c.bench_function("readability", |b| b.iter(|| readability.parse(black_box(&html), None)));
}

fn bench_preprocess(c: &mut Criterion) {
    let html = article_page();
    let config = Default::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_feed(c: &mut Criterion) {
    let xml = std::fs::read_to_string("tests/fixtures/feeds/world.rss").unwrap();

    c.bench_function("parse_feed", |b| b.iter(|| parse_feed(black_box(&xml))));
}

fn bench_fingerprint(c: &mut Criterion) {
    let content = article_page();

    c.bench_function("fingerprint", |b| {
        b.iter(|| fingerprint(Some("Harbor cranes return"), Some(black_box(&content)), "https://harbor.example/x"))
    });
}

criterion_group!(benches, bench_dom_tree, bench_readability, bench_preprocess, bench_feed, bench_fingerprint);
criterion_main!(benches);
