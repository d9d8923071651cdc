use std::time::Instant;

use ns_core::index::RuleIndex;
use ns_core::matcher::Matcher;
use ns_core::types::{Request, RequestType};

use crate::lists;

pub struct PerfBudgetOptions {
    pub input_paths: Vec<String>,
    pub iterations: usize,
}

struct BudgetRequest {
    url: &'static str,
    request_type: &'static str,
    initiator: &'static str,
}

const BUDGET_BUILD_MS: f64 = 500.0;
const BUDGET_MATCH_P99_US: f64 = 1000.0;
const BUDGET_INDEX_MB: f64 = 30.0;

const BUDGET_REQUESTS: &[BudgetRequest] = &[
    BudgetRequest {
        url: "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js",
        request_type: "script",
        initiator: "https://example.com",
    },
    BudgetRequest {
        url: "https://www.google-analytics.com/analytics.js",
        request_type: "script",
        initiator: "https://example.com",
    },
    BudgetRequest {
        url: "https://example.com/style.css",
        request_type: "stylesheet",
        initiator: "https://example.com",
    },
    BudgetRequest {
        url: "https://cdn.example.com/image.png",
        request_type: "image",
        initiator: "https://example.com",
    },
    BudgetRequest {
        url: "https://api.example.com/data.json",
        request_type: "xmlhttprequest",
        initiator: "https://example.com",
    },
];

pub fn run_perf_budget(opts: PerfBudgetOptions) -> Result<(), String> {
    println!("Performance Budget Check");
    println!("==================================================");

    println!("Building index...");
    let (engine, stats) = lists::load_engine(&opts.input_paths, Default::default(), false)?;
    println!(
        "Loaded {} list(s): {} lines, {} rules, {} rejected",
        stats.lists, stats.lines, stats.accepted, stats.rejected
    );

    let index = engine.index();
    let index_mb = index.memory_usage() as f64 / (1024.0 * 1024.0);

    println!("Warming up...");
    let matcher = Matcher::new(&index);
    for _ in 0..1000 {
        for req in BUDGET_REQUESTS {
            let _ = should_block(&matcher, req);
        }
    }

    println!("Measuring match latency...");
    let latencies = measure_match_latency(&index, opts.iterations);
    let p50_us = percentile(&latencies, 0.50);
    let p99_us = percentile(&latencies, 0.99);

    let mut passed = true;
    println!();
    println!("Results");
    println!("--------------------------------------------------");

    passed &= report_budget("Index Memory", index_mb, BUDGET_INDEX_MB, "MB");
    passed &= report_budget("Load + Build", stats.total_ms, BUDGET_BUILD_MS, "ms");
    passed &= report_budget("Match P99 Latency", p99_us, BUDGET_MATCH_P99_US, "μs");
    println!("  Match P50 Latency: {:.2} μs", p50_us);

    println!();
    println!("==================================================");

    if passed {
        println!("✓ All performance budgets passed");
        Ok(())
    } else {
        Err("Performance budget exceeded".to_string())
    }
}

fn report_budget(name: &str, actual: f64, limit: f64, unit: &str) -> bool {
    let passed = actual <= limit;
    let status = if passed { "✓" } else { "✗" };
    println!(
        "{} {}: {:.2} {} (limit: {:.2} {})",
        status, name, actual, unit, limit, unit
    );
    passed
}

fn measure_match_latency(index: &RuleIndex, iterations: usize) -> Vec<f64> {
    let matcher = Matcher::new(index);
    let mut latencies = Vec::with_capacity(iterations * BUDGET_REQUESTS.len());

    for _ in 0..iterations {
        for req in BUDGET_REQUESTS {
            let start = Instant::now();
            let _ = should_block(&matcher, req);
            let elapsed = start.elapsed().as_secs_f64() * 1_000_000.0;
            latencies.push(elapsed);
        }
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    latencies
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

fn should_block(matcher: &Matcher, req: &BudgetRequest) -> bool {
    let request = Request::new(req.url, req.initiator, RequestType::from_request_name(req.request_type));
    matcher.classify(&request).is_blocked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&sorted, 0.5), 5.0);
        assert_eq!(percentile(&sorted, 0.99), 10.0);
        assert_eq!(percentile(&[], 0.99), 0.0);
    }
}
