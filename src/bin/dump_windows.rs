//! Debug binary: show how a saved transcript is cut into scan windows and what
//! the first primary prompt looks like. Makes no model calls.
//!
//! Usage: cargo run --bin dump_windows -- <transcript.json> [--prompt]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use podclip_lib::config::{DiscoveryMode, EngineConfig};
use podclip_lib::finder::{scan_prompt, single_pass_prompt, SourceMetadata};
use podclip_lib::transcript::{render_for_single_pass, segment_into_windows, Transcript};

#[derive(Parser, Debug)]
#[clap(name = "dump_windows")]
#[clap(about = "Print scan windows and the discovery prompt for a transcript")]
struct Args {
    /// Transcript JSON file
    transcript: PathBuf,

    /// Config file
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also print the primary prompt for the first window (or the single pass)
    #[clap(long)]
    prompt: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let contents = std::fs::read_to_string(&args.transcript)
        .with_context(|| format!("Failed to read {}", args.transcript.display()))?;
    let transcript: Transcript = serde_json::from_str(&contents).context("Failed to parse transcript JSON")?;

    let discovery = &config.discovery;
    let windows = segment_into_windows(&transcript, discovery.window_secs, discovery.overlap_secs);
    info!("{} segments -> {} windows ({}s target, {}s overlap)",
        transcript.segments.len(), windows.len(), discovery.window_secs, discovery.overlap_secs);

    for (i, window) in windows.iter().enumerate() {
        let preview: String = window.text.chars().take(80).collect();
        let ellipsis = if window.text.chars().count() > 80 { "..." } else { "" };
        println!("[{}] {:.1}s-{:.1}s ({} segments, {} chars): \"{}{}\"",
            i, window.start_time, window.end_time, window.segments.len(),
            window.text.chars().count(), preview.replace('\n', " "), ellipsis);
    }

    if args.prompt {
        let meta = SourceMetadata {
            title: "(title)".to_string(),
            channel: "(channel)".to_string(),
        };
        let catalog = config.pattern_catalog();
        let band = config.filter.duration_band(discovery.mode);
        let prompt = match discovery.mode {
            DiscoveryMode::Scan => windows.first()
                .map(|w| scan_prompt(w, &meta, &catalog, discovery.window_prompt_chars, band)),
            DiscoveryMode::SinglePass => {
                let rendered = render_for_single_pass(&transcript, discovery.single_pass_prompt_chars, discovery.intro_skip_secs);
                Some(single_pass_prompt(&rendered, &meta, &catalog, band, discovery.intro_skip_secs))
            }
        };
        match prompt {
            Some(prompt) => println!("\n{}", prompt),
            None => println!("\n(no windows, no prompt)"),
        }
    }

    Ok(())
}
