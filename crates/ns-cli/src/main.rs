//! NetSieve CLI
//!
//! CLI tool for checking filter lists and exercising the matching engine.

mod acceptance;
mod lists;
mod perf_budget;

use clap::{Parser, Subcommand};

use ns_core::types::RequestType;

#[derive(Parser)]
#[command(name = "ns-cli")]
#[command(about = "NetSieve filter list tools")]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse filter lists and report rule counts
    Check {
        /// Input filter list files
        #[arg(short, long, required = true)]
        input: Vec<String>,
    },

    /// Classify a single request
    Classify {
        /// Filter list files (built-in list when omitted)
        #[arg(short, long)]
        list: Vec<String>,

        /// Request URL
        #[arg(long)]
        url: String,

        /// Initiating page host or URL
        #[arg(long, default_value = "")]
        source: String,

        /// Request type (script, image, xhr, document, ...)
        #[arg(long = "type", default_value = "other")]
        request_type: String,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<String>,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print element-hiding selectors for a page host
    Cosmetic {
        /// Filter list files (built-in list when omitted)
        #[arg(short, long)]
        list: Vec<String>,

        /// Page host
        #[arg(long)]
        domain: String,
    },

    /// Run the ad/normal URL acceptance scenario
    Acceptance {
        /// Filter list files (built-in list when omitted)
        #[arg(short, long)]
        list: Vec<String>,
    },

    /// Check index memory and match latency against budgets
    PerfBudget {
        /// Filter list files (built-in list when omitted)
        #[arg(short, long)]
        list: Vec<String>,

        /// Measurement rounds over the sample requests
        #[arg(long, default_value_t = 2000)]
        iterations: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Check { input } => cmd_check(&input),
        Commands::Classify {
            list,
            url,
            source,
            request_type,
            config,
            json,
        } => cmd_classify(&list, &url, &source, &request_type, config.as_deref(), json),
        Commands::Cosmetic { list, domain } => cmd_cosmetic(&list, &domain),
        Commands::Acceptance { list } => cmd_acceptance(&list),
        Commands::PerfBudget { list, iterations } => perf_budget::run_perf_budget(perf_budget::PerfBudgetOptions {
            input_paths: list,
            iterations,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_check(inputs: &[String]) -> Result<(), String> {
    if inputs.is_empty() {
        return Err("No input files specified".to_string());
    }

    let (engine, stats) = lists::load_engine(inputs, Default::default(), true)?;
    let index = engine.index();
    let index_stats = index.stats();

    println!("Checked {} filter lists", stats.lists);
    println!("  Lines:       {}", stats.lines);
    println!("  Accepted:    {}", stats.accepted);
    println!("  Rejected:    {}", stats.rejected);
    println!(
        "  Network:     {} ({} domain, {} substring, {} pattern, {} exceptions)",
        index_stats.network_rules,
        index_stats.domain_rules,
        index_stats.substring_rules,
        index_stats.pattern_rules,
        index_stats.exception_rules
    );
    println!("  Cosmetic:    {}", index_stats.cosmetic_rules);
    println!(
        "  Domain tree: {} nodes, {} labels",
        index_stats.domain_tree_nodes, index_stats.domain_labels
    );
    println!("  Memory:      ~{:.1} KB", index.memory_usage() as f64 / 1024.0);
    println!("  Time:        {:.1}ms", stats.total_ms);

    Ok(())
}

fn cmd_classify(
    inputs: &[String],
    url: &str,
    source: &str,
    request_type: &str,
    config: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let config = lists::read_config(config)?;
    let (engine, _) = lists::load_engine(inputs, config, false)?;

    let decision = engine.classify(url, source, RequestType::from_request_name(request_type));

    if json {
        let out = serde_json::to_string_pretty(&decision)
            .map_err(|e| format!("Failed to encode decision: {}", e))?;
        println!("{out}");
        return Ok(());
    }

    println!("{:?} {}", decision.action, url);
    if let Some(rule) = &decision.matched_rule {
        println!("  Rule:   {} (list {}, {:?})", rule.text, rule.list_id, rule.shape);
    }
    if decision.is_blocked() {
        println!("  Saved:  ~{} bytes", decision.bytes_estimate);
    }

    Ok(())
}

fn cmd_cosmetic(inputs: &[String], domain: &str) -> Result<(), String> {
    let (engine, _) = lists::load_engine(inputs, Default::default(), false)?;
    let selectors = engine.cosmetic_selectors(domain);

    if selectors.is_empty() {
        println!("No selectors for {}", domain);
        return Ok(());
    }
    for selector in selectors {
        println!("{selector}");
    }

    Ok(())
}

fn cmd_acceptance(inputs: &[String]) -> Result<(), String> {
    let (engine, _) = lists::load_engine(inputs, Default::default(), false)?;
    acceptance::run_acceptance(&engine)
}
