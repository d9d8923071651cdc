use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use ns_compiler::{parse_list, FilterListManager, DEFAULT_LIST, DEFAULT_LIST_NAME};
use ns_core::matcher::classify;
use ns_core::types::{Request, RequestType};

const URLS: &[&str] = &[
    "https://doubleclick.net/ads/banner.js",
    "https://googleadservices.com/pagead/conversion.js",
    "https://googlesyndication.com/adsbygoogle.js",
    "https://facebook.com/tr",
    "https://example.com/index.html",
    "https://github.com/user/repo",
    "https://stackoverflow.com/questions",
    "https://youtube.com/watch?v=123",
];

/// Synthetic list: many domain rules, some literals and wildcard patterns.
fn synthetic_list(domains: usize) -> String {
    let mut text = String::from(DEFAULT_LIST);
    for i in 0..domains {
        text.push_str(&format!("||ads{i}.tracker{}.com^\n", i % 97));
        if i % 10 == 0 {
            text.push_str(&format!("/banner{i}/\n"));
        }
        if i % 25 == 0 {
            text.push_str(&format!("/pixel{i}/*.gif^$image\n"));
        }
    }
    text
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for size in [100, 10_000, 100_000] {
        let mut manager = FilterListManager::new();
        manager.add_list(DEFAULT_LIST_NAME, &synthetic_list(size)).unwrap();
        let index = manager.rebuild();

        group.throughput(Throughput::Elements(URLS.len() as u64));
        group.bench_function(format!("{size}_rules"), |b| {
            b.iter(|| {
                for url in URLS {
                    let request = Request::new(url, "example.com", RequestType::SCRIPT);
                    black_box(classify(&request, &index));
                }
            })
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let text = synthetic_list(10_000);

    c.bench_function("parse_10000_rules", |b| b.iter(|| black_box(parse_list(&text, 0))));

    let mut manager = FilterListManager::new();
    manager.add_list(DEFAULT_LIST_NAME, &text).unwrap();
    c.bench_function("rebuild_10000_rules", |b| b.iter(|| black_box(manager.rebuild())));
}

criterion_group!(benches, bench_classify, bench_build);
criterion_main!(benches);
