use std::fs;
use std::path::Path;
use std::time::Instant;

use ns_compiler::{Engine, DEFAULT_LIST, DEFAULT_LIST_NAME};
use ns_core::config::EngineConfig;

#[derive(Debug, Clone)]
pub struct LoadStats {
    pub lists: usize,
    pub lines: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total_ms: f64,
}

/// Name a list after its file name.
fn list_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

pub fn read_config(path: Option<&str>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
            EngineConfig::from_json(&text).map_err(|e| format!("Invalid config '{}': {}", path, e))
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Build an engine from list files, or from the built-in list when none are given.
pub fn load_engine(inputs: &[String], config: EngineConfig, verbose: bool) -> Result<(Engine, LoadStats), String> {
    let start = Instant::now();
    let engine = Engine::new(config);
    let mut stats = LoadStats {
        lists: 0,
        lines: 0,
        accepted: 0,
        rejected: 0,
        total_ms: 0.0,
    };

    let mut sources = Vec::new();
    if inputs.is_empty() {
        sources.push((DEFAULT_LIST_NAME.to_string(), DEFAULT_LIST.to_string()));
    }
    for path in inputs {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        sources.push((list_name(path), content));
    }

    for (name, content) in &sources {
        let report = engine
            .add_list(name, content)
            .map_err(|e| format!("Failed to add '{}': {}", name, e))?;

        if verbose {
            println!(
                "  [{}] {} - {} lines, {} rules, {} rejected",
                stats.lists,
                name,
                report.lines,
                report.accepted,
                report.rejected()
            );
            for sample in &report.rejected_samples {
                println!("      line {}: {} ({})", sample.line, sample.text, sample.error);
            }
        }

        stats.lists += 1;
        stats.lines += report.lines;
        stats.accepted += report.accepted;
        stats.rejected += report.rejected();
    }

    engine.rebuild();
    stats.total_ms = start.elapsed().as_secs_f64() * 1000.0;
    log::info!(
        "Loaded {} list(s), {} rules accepted, {} rejected in {:.1}ms",
        stats.lists,
        stats.accepted,
        stats.rejected,
        stats.total_ms
    );

    Ok((engine, stats))
}
