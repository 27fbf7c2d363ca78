use std::path::PathBuf;
use std::process::ExitCode;

use adhist::{Adhist, AdhistConfig, AdhistError};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Generate causal ad-interaction history features from sorted click logs.
///
/// Without `--config` the built-in plan and file layout are used.
#[derive(Debug, Parser)]
#[command(name = "adhist-gen", version)]
struct Args {
    /// JSON file with an `AdhistConfig`; missing keys take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the output directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of runs executed at once.
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Only generate these feature sets (repeatable).
    #[arg(short = 'f', long = "feature-set", value_name = "NAME")]
    feature_sets: Vec<String>,

    /// Log progress every this many rows (0 disables).
    #[arg(long)]
    progress_every: Option<u64>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> Result<AdhistConfig, AdhistError> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| AdhistError::io(path, &e))?;
            serde_json::from_str(&text).map_err(|e| {
                AdhistError::InvalidConfig(format!("{}: {e}", path.display()))
            })?
        }
        None => AdhistConfig::default(),
    };

    if let Some(dir) = &args.output_dir {
        cfg.output_dir.clone_from(dir);
    }
    if let Some(jobs) = args.jobs {
        cfg.max_concurrent_runs = jobs;
    }
    if let Some(every) = args.progress_every {
        cfg.progress_every = every;
    }
    if let Some(unknown) = args
        .feature_sets
        .iter()
        .find(|name| !cfg.feature_sets.iter().any(|fs| &fs.name == *name))
    {
        return Err(AdhistError::InvalidConfig(format!(
            "unknown feature set: {unknown}"
        )));
    }
    if !args.feature_sets.is_empty() {
        cfg.feature_sets.retain(|fs| args.feature_sets.contains(&fs.name));
    }
    Ok(cfg)
}

async fn run(args: Args) -> Result<(), AdhistError> {
    let cfg = load_config(&args)?;
    if args.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| AdhistError::Other(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    let adhist = Adhist::builder().config(cfg).build()?;
    for report in adhist.run_all().await? {
        tracing::info!(
            feature_set = %report.feature_set,
            scored = %report.scored_split,
            unscored = %report.unscored_split,
            rows = report.merge.total_rows(),
            seed_ms = u64::try_from(report.seed_elapsed.as_millis()).unwrap_or(u64::MAX),
            merge_ms = u64::try_from(report.merge_elapsed.as_millis()).unwrap_or(u64::MAX),
            "run finished"
        );
        println!(
            "{}: {} + {} rows",
            adhist.output_path(&report.feature_set, &report.scored_split).display(),
            report.merge.scored_rows,
            report.merge.unscored_rows,
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG=info,adhist=debug shows per-pass spans
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let errors = err.flatten();
            for e in &errors {
                eprintln!("error: {e}");
            }
            if errors.iter().any(AdhistError::is_overflow) {
                eprintln!("hint: a counter saturated; rerun with a wider counter width");
            }
            ExitCode::FAILURE
        }
    }
}
