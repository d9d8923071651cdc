//! End-to-end behavior of the compiled engine.

use std::sync::Arc;
use std::thread;

use ns_compiler::{Engine, FilterListManager, DEFAULT_LIST, DEFAULT_LIST_NAME};
use ns_core::config::EngineConfig;
use ns_core::matcher::classify;
use ns_core::types::{Action, Request, RequestType, RuleShape};

const MOCK_LIST: &str = "||doubleclick.net^\n||googleadservices.com^\n@@||googleadservices.com/safe^";

const AD_URLS: &[&str] = &[
    "https://doubleclick.net/ads/banner.js",
    "https://googleadservices.com/pagead/conversion.js",
    "https://googlesyndication.com/adsbygoogle.js",
    "https://google-analytics.com/analytics.js",
    "https://facebook.com/tr",
    "https://amazon-adsystem.com/aax2/apstag.js",
    "https://youtube.com/api/stats/ads",
    "https://youtube.com/pagead/interaction",
];

const NORMAL_URLS: &[&str] = &[
    "https://example.com/index.html",
    "https://github.com/user/repo",
    "https://stackoverflow.com/questions",
    "https://youtube.com/watch?v=123",
];

fn engine_with(lists: &[(&str, &str)]) -> Engine {
    let engine = Engine::new(EngineConfig::default());
    for (name, text) in lists {
        engine.add_list(name, text).unwrap();
    }
    engine.rebuild();
    engine
}

#[test]
fn acceptance_block_rate_and_no_false_positives() {
    let engine = engine_with(&[("mock", MOCK_LIST), (DEFAULT_LIST_NAME, DEFAULT_LIST)]);

    let blocked = AD_URLS
        .iter()
        .filter(|url| engine.classify(url, "example.com", RequestType::SCRIPT).is_blocked())
        .count();
    let rate = blocked as f64 / AD_URLS.len() as f64;
    assert!(rate >= 0.8, "block rate {rate}");

    for url in NORMAL_URLS {
        let decision = engine.classify(url, "example.com", RequestType::DOCUMENT);
        assert_eq!(decision.action, Action::Allow, "{url} blocked by {:?}", decision.matched_rule);
    }

    let stats = engine.statistics();
    assert_eq!(stats.blocked_count, blocked as u64);
    assert_eq!(stats.allowed_count, (AD_URLS.len() - blocked + NORMAL_URLS.len()) as u64);
}

#[test]
fn mock_list_alone_blocks_only_its_domains() {
    let engine = engine_with(&[("mock", MOCK_LIST)]);

    let blocked: Vec<&str> = AD_URLS
        .iter()
        .copied()
        .filter(|url| engine.classify(url, "", RequestType::SCRIPT).is_blocked())
        .collect();
    assert_eq!(
        blocked,
        vec![
            "https://doubleclick.net/ads/banner.js",
            "https://googleadservices.com/pagead/conversion.js",
        ]
    );

    let safe = engine.classify("https://googleadservices.com/safe/x.js", "", RequestType::SCRIPT);
    assert_eq!(safe.action, Action::Allow);
    assert_eq!(
        safe.matched_rule.map(|m| m.text.to_string()),
        Some("@@||googleadservices.com/safe^".to_string())
    );
}

#[test]
fn exception_precedence() {
    let engine = engine_with(&[("l", "||ads.example.com^\n@@||ads.example.com/safe^")]);
    let d = engine.classify("https://ads.example.com/safe/img.png", "news.com", RequestType::IMAGE);
    assert_eq!(d.action, Action::Allow);
    assert!(engine.classify("https://ads.example.com/img.png", "news.com", RequestType::IMAGE).is_blocked());
}

#[test]
fn exception_in_later_list_still_wins() {
    let engine = engine_with(&[("blocks", "||cdn.example.com^"), ("allow", "@@/player.js")]);
    assert!(!engine.classify("https://cdn.example.com/player.js", "", RequestType::SCRIPT).is_blocked());
    assert!(engine.classify("https://cdn.example.com/ads.js", "", RequestType::SCRIPT).is_blocked());
}

#[test]
fn domain_anchoring() {
    let engine = engine_with(&[("l", "||doubleclick.net^")]);
    assert!(engine.classify("https://doubleclick.net/ads/banner.js", "", RequestType::SCRIPT).is_blocked());
    assert!(engine.classify("https://sub.doubleclick.net/x", "", RequestType::SCRIPT).is_blocked());
    assert!(!engine.classify("https://notdoubleclick.net/x", "", RequestType::SCRIPT).is_blocked());
    assert!(!engine.classify("https://example.com/?ref=doubleclick.net", "", RequestType::SCRIPT).is_blocked());
}

#[test]
fn resource_type_restriction() {
    let engine = engine_with(&[("l", "||tracker.com^$script")]);
    let url = "https://tracker.com/t.js";
    assert!(engine.classify(url, "news.com", RequestType::SCRIPT).is_blocked());
    assert!(!engine.classify(url, "news.com", RequestType::IMAGE).is_blocked());
}

#[test]
fn domain_anchored_outranks_substring() {
    let engine = engine_with(&[("l", "/banner/ads\n||ads.net^")]);
    let d = engine.classify("https://ads.net/banner/ads", "", RequestType::IMAGE);
    let rule = d.matched_rule.expect("blocked");
    assert_eq!(rule.shape, RuleShape::DomainAnchored);
    assert_eq!(&*rule.text, "||ads.net^");
}

#[test]
fn idempotent_rebuild() {
    let mut manager = FilterListManager::new();
    manager.add_list(DEFAULT_LIST_NAME, DEFAULT_LIST).unwrap();
    manager.add_list("mock", MOCK_LIST).unwrap();

    let first = manager.rebuild();
    let second = manager.rebuild();

    for url in AD_URLS.iter().chain(NORMAL_URLS) {
        for ty in [RequestType::SCRIPT, RequestType::IMAGE, RequestType::DOCUMENT] {
            let request = Request::new(url, "example.com", ty);
            assert_eq!(classify(&request, &first), classify(&request, &second), "{url}");
        }
    }
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn fail_open_on_malformed_urls() {
    let engine = engine_with(&[("l", "||ads.com^\n/ads/")]);
    for url in ["", "ads.com/ads/", "https://", "http:// ads.com/ads/", "::::", "https://\u{7f}ads.com/ads/"] {
        let d = engine.classify(url, "", RequestType::SCRIPT);
        assert_eq!(d.action, Action::Allow, "{url:?}");
        assert_eq!(d.bytes_estimate, 0);
    }
}

#[test]
fn concurrent_statistics_are_consistent() {
    let engine = Arc::new(engine_with(&[("l", "||ads.com^")]));
    let threads = 8;
    let per_thread = 500;

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    let url = if i % 2 == 0 { "https://ads.com/a.js" } else { "https://news.com/" };
                    engine.classify(url, "news.com", RequestType::SCRIPT);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = engine.statistics();
    assert_eq!(stats.blocked_count, (threads / 2 * per_thread) as u64);
    assert_eq!(stats.allowed_count, (threads / 2 * per_thread) as u64);
    assert_eq!(stats.bytes_saved, stats.blocked_count * 25 * 1024);
    assert_eq!(stats.by_domain.get("ads.com").copied(), Some(stats.blocked_count));
}

#[test]
fn rebuild_during_reads_never_tears() {
    let engine = Arc::new(engine_with(&[("l", "||ads.com^")]));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..2000 {
                    // Within one captured index the answer is stable
                    let index = engine.index();
                    let request = Request::new("https://ads.com/x", "", RequestType::IMAGE);
                    let a = classify(&request, &index);
                    let b = classify(&request, &index);
                    assert_eq!(a, b);
                }
            })
        })
        .collect();

    for i in 0..50 {
        engine.set_enabled("l", i % 2 == 0).unwrap();
        engine.rebuild();
    }
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn cosmetic_selectors_follow_domains() {
    let engine = engine_with(&[(
        "c",
        "##.ad\nnews.com##.sponsored\n~shop.com##.promo\nshop.com#@#.ad",
    )]);

    let news: Vec<String> = engine.cosmetic_selectors("news.com").iter().map(|s| s.to_string()).collect();
    assert_eq!(news, vec![".sponsored", ".ad", ".promo"]);

    let shop: Vec<String> = engine.cosmetic_selectors("www.shop.com").iter().map(|s| s.to_string()).collect();
    assert!(shop.is_empty());

    // Cosmetic rules never block requests
    assert!(!engine.classify("https://news.com/.ad", "", RequestType::OTHER).is_blocked());
}

#[test]
fn ip_literal_hosts() {
    let engine = engine_with(&[("ip", "/track\n/pixel^$third-party")]);

    let d = engine.classify("http://[::1]:8080/track", "", RequestType::IMAGE);
    assert!(d.is_blocked());
    assert_eq!(d.domain, "[::1]");

    assert!(engine
        .classify("http://10.0.1.1/pixel", "192.168.1.1", RequestType::IMAGE)
        .is_blocked());
    assert!(!engine
        .classify("http://10.0.1.1/pixel", "http://10.0.1.1/", RequestType::IMAGE)
        .is_blocked());

    let stats = engine.statistics();
    assert_eq!(stats.by_domain.get("[::1]"), Some(&1));
    assert_eq!(stats.by_domain.get("10.0.1.1"), Some(&1));
    assert!(!stats.by_domain.contains_key("["));
}
