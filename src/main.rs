use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use biomarker_cli::{
    labels, BatchRunner, DspToolkit, ExtractionConfig, FeatureExtractionPipeline,
};

/// Batch extractor for acoustic voice features from speech recordings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV with an `id` column listing the participants to process
    #[arg(short, long)]
    labels: PathBuf,

    /// Directory containing the audio recordings
    #[arg(short, long)]
    audio_dir: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "voice_features.csv")]
    output: PathBuf,

    /// Number of extraction workers (1 = sequential)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to a JSON config file with analysis parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ExtractionConfig::load(path)?,
        None => ExtractionConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }

    info!("Voice feature extraction starting");
    info!("Labels: {:?}", args.labels);
    info!("Audio directory: {:?}", args.audio_dir);
    info!("Output: {:?}", args.output);

    // A bad label table is the one unrecoverable input.
    let ids = labels::load_participant_ids(&args.labels)?;
    let matched = labels::match_audio_files(&args.audio_dir, &ids)?;

    if matched.is_empty() {
        bail!(
            "no audio files in {} match the {} participant ids",
            args.audio_dir.display(),
            ids.len()
        );
    }
    let unmatched = ids.len() - matched.len();
    if unmatched > 0 {
        warn!(unmatched, "participants with no matching recording");
    }

    let pipeline = FeatureExtractionPipeline::new(DspToolkit, config);
    let runner = BatchRunner::new(pipeline);
    let items: Vec<_> = matched.into_iter().collect();
    let total = items.len();

    let table = runner.run(items);
    table.write_csv(&args.output)?;

    println!("\n--- Extraction Summary ---");
    println!("Participants in label table: {}", ids.len());
    println!("Recordings processed: {total}");
    println!("Rows written: {}", table.len());
    let complete = table
        .records()
        .iter()
        .filter(|r| r.computed_count() > 0)
        .count();
    println!("Rows with at least one feature: {complete}");
    println!("Output: {}", args.output.display());

    info!("Extraction complete");
    Ok(())
}
