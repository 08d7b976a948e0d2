use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use drone_link_analyzer::compare::compare_datasets;
use drone_link_analyzer::config::DEFAULT_UTC_OFFSET_HOURS;
use drone_link_analyzer::discover::scan_datasets;
use drone_link_analyzer::report;
use drone_link_analyzer::{
    run_analysis, run_analysis_strict, AnalysisConfig, AnalysisResult, FileMatchPolicy,
};

#[derive(Parser)]
#[command(name = "drone-link-analyzer")]
#[command(
    about = "Correlates drone link delay and signal quality with inter-drone distance",
    long_about = None
)]
struct Cli {
    /// Hours east of UTC used to display log timestamps
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_UTC_OFFSET_HOURS,
        allow_hyphen_values = true
    )]
    utc_offset: i32,
    /// What to do when several log files match the same pattern
    #[arg(long, global = true, value_enum, default_value_t = FileMatchPolicy::First)]
    on_multiple: FileMatchPolicy,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one dataset folder containing sender/ and receiver/
    Analyze {
        dataset: PathBuf,
        /// Where to write the JSON result (default: analysis_results_<dataset>.json)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write a markdown report
        #[arg(long)]
        report: Option<PathBuf>,
        /// Fail instead of skipping streams that cannot be read
        #[arg(long)]
        strict: bool,
    },
    /// List dataset folders under a data directory
    Discover {
        #[arg(long, default_value = "data")]
        root: PathBuf,
    },
    /// Compare headline metrics across datasets
    Compare {
        #[arg(required = true, num_args = 2..)]
        datasets: Vec<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render a markdown report from a saved JSON result
    Report {
        #[arg(long)]
        results: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}

fn dataset_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AnalysisConfig::new(cli.utc_offset, cli.on_multiple)?;

    match cli.command {
        Commands::Analyze {
            dataset,
            out,
            report: report_path,
            strict,
        } => {
            let analysis = if strict {
                run_analysis_strict(&dataset, &config)
            } else {
                run_analysis(&dataset, &config)
            }
            .with_context(|| format!("failed to analyze {}", dataset.display()))?;

            let name = dataset_name(&dataset);
            let out = out.unwrap_or_else(|| PathBuf::from(format!("analysis_results_{name}.json")));
            analysis.result().save(&out)?;
            println!("Analysis results written to {}.", out.display());

            if let Some(path) = report_path {
                std::fs::write(&path, report::build_report(&name, analysis.result()))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Report written to {}.", path.display());
            }
        }
        Commands::Discover { root } => {
            let datasets = scan_datasets(&root)?;
            if datasets.is_empty() {
                println!(
                    "No datasets with sender/ and receiver/ folders under {}.",
                    root.display()
                );
                return Ok(());
            }

            println!("Datasets under {}:", root.display());
            for dataset in &datasets {
                println!(
                    "- {} (udp: {}, nexfi: {}, gps: {}){}",
                    dataset.name,
                    dataset.has_udp,
                    dataset.has_nexfi,
                    dataset.has_gps,
                    if dataset.usable() { "" } else { " [missing UDP pair]" }
                );
            }
        }
        Commands::Compare { datasets, out } => {
            let comparison = compare_datasets(&datasets, &config)?;
            let text = serde_json::to_string_pretty(&comparison)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Comparison written to {}.", path.display());
                }
                None => println!("{text}"),
            }
        }
        Commands::Report { results, out } => {
            let result = AnalysisResult::load(&results)?;
            let name = results
                .file_stem()
                .map(|s| s.to_string_lossy().trim_start_matches("analysis_results_").to_string())
                .unwrap_or_default();
            std::fs::write(&out, report::build_report(&name, &result))
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!("rendered {} categories", result.categories().len());
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
