use ns_compiler::Engine;
use ns_core::types::RequestType;

/// Ad requests the engine is expected to block.
pub const AD_URLS: &[&str] = &[
    "https://doubleclick.net/ads/banner.js",
    "https://googleadservices.com/pagead/conversion.js",
    "https://googlesyndication.com/adsbygoogle.js",
    "https://google-analytics.com/analytics.js",
    "https://facebook.com/tr",
    "https://amazon-adsystem.com/aax2/apstag.js",
    "https://youtube.com/api/stats/ads",
    "https://youtube.com/pagead/interaction",
];

/// Ordinary requests that must never be blocked.
pub const NORMAL_URLS: &[&str] = &[
    "https://example.com/index.html",
    "https://github.com/user/repo",
    "https://stackoverflow.com/questions",
    "https://youtube.com/watch?v=123",
];

const MIN_BLOCK_RATE: f64 = 0.8;
const SOURCE_DOMAIN: &str = "example.com";

pub fn run_acceptance(engine: &Engine) -> Result<(), String> {
    println!("Acceptance Scenario");
    println!("==================================================");

    engine.reset_statistics();
    engine.reset_metrics();
    let mut errors = Vec::new();
    let mut ad_blocked = 0usize;

    println!("Ad requests:");
    for url in AD_URLS {
        let decision = engine.classify(url, SOURCE_DOMAIN, RequestType::SCRIPT);
        let rule = decision.matched_rule.as_ref().map_or("-", |rule| &*rule.text);
        let status = if decision.is_blocked() {
            ad_blocked += 1;
            "✓ blocked"
        } else {
            "✗ allowed"
        };
        println!("  {} {} [{}]", status, url, rule);
    }

    println!("Normal requests:");
    for url in NORMAL_URLS {
        let decision = engine.classify(url, SOURCE_DOMAIN, RequestType::DOCUMENT);
        if decision.is_blocked() {
            let rule = decision.matched_rule.as_ref().map_or("-", |rule| &*rule.text);
            println!("  ✗ blocked {} [{}]", url, rule);
            errors.push(format!("False positive: {} blocked by {}", url, rule));
        } else {
            println!("  ✓ allowed {}", url);
        }
    }

    let stats = engine.statistics();
    let rate = ad_blocked as f64 / AD_URLS.len() as f64;

    println!();
    println!(
        "Block rate: {:.0}% ({}/{}), bytes saved: {}",
        rate * 100.0,
        ad_blocked,
        AD_URLS.len(),
        stats.bytes_saved
    );
    let metrics = engine.metrics();
    println!(
        "Classify: {} requests, avg {} ns, max {} ns",
        metrics.requests, metrics.avg_classify_ns, metrics.max_classify_ns
    );
    if rate < MIN_BLOCK_RATE {
        errors.push(format!(
            "Block rate {:.0}% below {:.0}%",
            rate * 100.0,
            MIN_BLOCK_RATE * 100.0
        ));
    }

    if errors.is_empty() {
        println!("✓ Acceptance checks passed");
        Ok(())
    } else {
        Err(format!("Acceptance failed:\n- {}", errors.join("\n- ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::config::EngineConfig;

    #[test]
    fn test_default_engine_passes() {
        let engine = Engine::with_default_lists(EngineConfig::default()).unwrap();
        assert!(run_acceptance(&engine).is_ok());
    }

    #[test]
    fn test_empty_engine_fails() {
        let engine = Engine::new(EngineConfig::default());
        assert!(run_acceptance(&engine).is_err());
    }
}
