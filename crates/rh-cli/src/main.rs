//! reheader CLI
//!
//! CLI tool for validating profiles and replaying rewrites from JSON fixtures.

mod bench;
mod fixtures;

use std::path::Path;

use clap::{Parser, Subcommand};

use bench::{BenchOptions, Phase};
use rh_compiler::{optimize_profile, select_active_profiles, BadgeState, OptimizeStats, PauseMenuState};
use rh_core::{Combine, Engine, EngineSettings, FilterPolicy, SystemValues, ValueSource};

#[derive(Parser)]
#[command(name = "rh-cli")]
#[command(about = "reheader profile tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and compile a profile list, reporting problems
    Check {
        /// Profiles JSON file (array of profiles)
        #[arg(short, long)]
        input: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run one rewrite entry point and print the result as JSON
    Rewrite {
        /// Storage snapshot JSON file
        #[arg(short, long)]
        storage: String,

        /// Request context JSON file
        #[arg(short, long)]
        context: String,

        /// Entry point to run
        #[arg(long, value_enum, default_value = "request")]
        phase: Phase,

        /// A profile applies when any filter kind matches
        #[arg(long)]
        match_any: bool,
    },

    /// Show active profiles and browser action state
    Info {
        /// Storage snapshot JSON file
        #[arg(short, long)]
        storage: String,
    },

    /// Measure rewrite latency
    Bench {
        /// Storage snapshot JSON file
        #[arg(short, long)]
        storage: String,

        /// Request context JSON file
        #[arg(short, long)]
        context: String,

        /// Entry point to measure (all when omitted)
        #[arg(long, value_enum)]
        phase: Option<Phase>,

        /// Measured iterations per entry point
        #[arg(short = 'n', long, default_value_t = 10_000)]
        iterations: usize,

        /// Warmup iterations per entry point
        #[arg(long, default_value_t = 1_000)]
        warmup: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { input, verbose } => cmd_check(&input, verbose),
        Commands::Rewrite {
            storage,
            context,
            phase,
            match_any,
        } => cmd_rewrite(&storage, &context, phase, match_any),
        Commands::Info { storage } => cmd_info(&storage),
        Commands::Bench {
            storage,
            context,
            phase,
            iterations,
            warmup,
        } => cmd_bench(&storage, &context, phase, iterations, warmup),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_check(input: &str, verbose: bool) -> Result<(), String> {
    let profiles = fixtures::read_profiles(Path::new(input))?;

    let mut total = OptimizeStats::default();
    let mut failed = 0usize;

    for (index, stored) in profiles.iter().enumerate() {
        let title = if stored.title.is_empty() { "(untitled)" } else { stored.title.as_str() };
        match optimize_profile(stored) {
            Ok((_, stats)) => {
                if verbose {
                    println!(
                        "  [{}] {} - {} -> {} modifiers, {} -> {} filters",
                        index,
                        title,
                        stats.modifiers_before,
                        stats.modifiers_after,
                        stats.filters_before,
                        stats.filters_after
                    );
                }
                for pattern in &stats.invalid_patterns {
                    println!("  warning: [{}] {}: invalid pattern {:?} never matches", index, title, pattern);
                }
                total.merge(&stats);
            }
            Err(e) => {
                println!("  error: [{}] {}: {}", index, title, e);
                failed += 1;
            }
        }
    }

    println!("Checked {} profiles from '{}'", profiles.len(), input);
    println!("  Modifiers: {} -> {}", total.modifiers_before, total.modifiers_after);
    println!("  Filters:   {} -> {}", total.filters_before, total.filters_after);
    println!("  Invalid patterns: {}", total.invalid_patterns.len());

    if failed > 0 {
        return Err(format!("{} profile(s) failed to compile", failed));
    }
    Ok(())
}

fn cmd_rewrite(storage_path: &str, context_path: &str, phase: Phase, match_any: bool) -> Result<(), String> {
    let storage = fixtures::read_storage(Path::new(storage_path))?;
    let fixture = fixtures::read_context(Path::new(context_path))?;

    let active = select_active_profiles(&storage);
    for error in &active.errors {
        eprintln!("warning: {}: {}", error.title, error.error);
    }

    let settings = EngineSettings {
        paused: storage.is_paused,
        locked_tab_id: active.locked_tab_id,
        filter_policy: FilterPolicy {
            across_kinds: if match_any { Combine::Any } else { Combine::All },
        },
        ..EngineSettings::default()
    };
    let engine = Engine::new(settings);
    let result = phase.run(&engine, &active.profiles, &fixture.context(SystemValues.now_ms()));

    let json = serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to serialize result: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn cmd_info(storage_path: &str) -> Result<(), String> {
    let storage = fixtures::read_storage(Path::new(storage_path))?;
    let active = select_active_profiles(&storage);

    println!("Storage: {}", storage_path);
    println!("  Stored profiles:  {}", storage.profiles.len());
    println!("  Managed profiles: {}", storage.managed_profiles.len());
    println!("  Paused:           {}", storage.is_paused);
    if let Some(tab_id) = storage.locked_tab_id {
        println!("  Locked to tab:    {}", tab_id);
    }
    println!();

    println!("Active profiles:");
    for (index, profile) in active.profiles.iter().enumerate() {
        let marker = if active.selected == Some(index) { "*" } else { " " };
        println!(
            " {}[{}] {} - {} modifiers, {} filters{}",
            marker,
            index,
            profile.title,
            profile.modifier_count(),
            profile.filters.len(),
            if profile.always_on { " (always on)" } else { "" }
        );
    }
    for error in &active.errors {
        println!("  skipped: {}: {}", error.title, error.error);
    }
    println!();

    let badge = BadgeState::compute(storage.is_paused, &active);
    println!("Badge:");
    println!("  Icon:  {}", badge.icon.path());
    println!("  Text:  {:?}", badge.text);
    println!("  Color: {}", badge.color);
    println!("Context menu: {}", PauseMenuState::new(storage.is_paused).title());

    Ok(())
}

fn cmd_bench(
    storage_path: &str,
    context_path: &str,
    phase: Option<Phase>,
    iterations: usize,
    warmup: usize,
) -> Result<(), String> {
    let storage = fixtures::read_storage(Path::new(storage_path))?;
    let fixture = fixtures::read_context(Path::new(context_path))?;
    let active = select_active_profiles(&storage);

    // Measure the rewrite itself, not the paused short-circuit.
    let engine = Engine::new(EngineSettings {
        locked_tab_id: active.locked_tab_id,
        ..EngineSettings::default()
    });
    let opts = BenchOptions {
        phases: phase.map_or_else(|| vec![Phase::Url, Phase::Request, Phase::Response], |p| vec![p]),
        iterations,
        warmup_ops: warmup,
    };

    println!(
        "Benchmarking {} active profiles ({} modifiers) against {}",
        active.profiles.len(),
        active.modifier_count(),
        fixture.url
    );
    let summaries = bench::run_bench(&engine, &active.profiles, &fixture.context(SystemValues.now_ms()), &opts)?;
    bench::print_summaries(&summaries);
    Ok(())
}
