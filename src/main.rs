//! Find shareable clips in a saved transcript.
//!
//! Usage: podclip <transcript.json> --title "Episode" --channel "Bankless" [--json]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use podclip_lib::config::EngineConfig;
use podclip_lib::finder::{format_candidate_for_review, ClipFinder};
use podclip_lib::llm::build_completion;
use podclip_lib::transcript::{Transcript, TranscriptSegment};

#[derive(Parser, Debug)]
#[clap(name = "podclip")]
#[clap(about = "Find short, shareable quote clips in a podcast transcript")]
struct Args {
    /// Transcript JSON: a transcript object or a bare array of segments
    transcript: PathBuf,

    /// Episode title shown to the model
    #[clap(long, default_value = "")]
    title: String,

    /// Channel name or handle, used for the tier lookup
    #[clap(long, default_value = "")]
    channel: String,

    /// Config file (defaults to $PODCLIP_CONFIG, then the user config dir)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Completion provider override (anthropic | ollama)
    #[clap(long)]
    provider: Option<String>,

    /// Model override
    #[clap(long)]
    model: Option<String>,

    /// Print the selection as JSON instead of review summaries
    #[clap(long)]
    json: bool,
}

fn load_transcript(path: &Path) -> Result<Transcript> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;

    if let Ok(transcript) = serde_json::from_str::<Transcript>(&contents) {
        return Ok(transcript);
    }

    let segments: Vec<TranscriptSegment> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse transcript JSON {}", path.display()))?;
    let source_id = path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Transcript::new(source_id, segments))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(provider) = args.provider {
        config.provider.kind = provider;
    }
    if let Some(model) = args.model {
        config.provider.model = Some(model);
    }

    let transcript = load_transcript(&args.transcript)?;
    info!("Loaded {} segments ({:.0}s) from {}",
        transcript.segments.len(), transcript.duration(), args.transcript.display());

    let completion = build_completion(&config.provider).context("Failed to set up completion provider")?;
    let catalog = Arc::new(config.pattern_catalog());
    let finder = ClipFinder::new(config, catalog, completion).context("Invalid configuration")?;

    let start = std::time::Instant::now();
    let selection = finder.find_clips(&transcript, &args.title, &args.channel).await;
    info!("Finished in {:.1}s: {} clips (tier {})",
        start.elapsed().as_secs_f64(), selection.len(), selection.tier);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
        return Ok(());
    }

    if selection.is_empty() {
        println!("No clips found.");
        return Ok(());
    }

    for (i, clip) in selection.clips.iter().enumerate() {
        println!("--- Clip {} ---", i + 1);
        println!("{}\n", format_candidate_for_review(clip));
    }

    Ok(())
}
