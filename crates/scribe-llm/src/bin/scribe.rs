//! Command-line front end for transcript post-processing and scrubbing.
//!
//! Reads text from stdin. Logs go to stderr; stdout carries only results.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scribe_core::fingerprint::fingerprint;
use scribe_core::{ScrubPolicy, Scrubber, TranscriptPipeline};
use scribe_llm::{PresidioClient, ScribeConfig};

#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "ICU dictation post-processing and PHI scrubbing")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post-process a raw transcript and print the result as JSON
    Process {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Scrub PHI through the Presidio sidecar and print the tokenized text
    Scrub,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scribe=info,scribe_llm=info,scribe_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read stdin")?;
    Ok(input)
}

async fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn process(pretty: bool) -> Result<()> {
    let raw = read_stdin().await?;
    let result = TranscriptPipeline::new().process(&raw);
    info!(
        transcript = %fingerprint(&raw),
        encounter_type = %result.encounter_type,
        corrections = result.corrections_applied.len(),
        hallucination = result.is_hallucination,
        "processed transcript"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    write_stdout(&json).await
}

async fn scrub() -> Result<()> {
    let config = ScribeConfig::from_env().context("invalid configuration")?;
    let policy = ScrubPolicy {
        min_score: config.presidio.min_score,
        timeout: config.presidio.timeout,
        ..ScrubPolicy::default()
    };
    let engine = PresidioClient::new(config.presidio).context("failed to build Presidio client")?;
    let scrubber = Scrubber::with_policy(Arc::new(engine), policy);

    let raw = read_stdin().await?;
    let scrubbed = scrubber.scrub(&raw).await.context("scrub failed, nothing written")?;
    info!(transcript = %fingerprint(&raw), tokens = scrubbed.mapping.len(), "scrubbed input");

    write_stdout(&scrubbed.text).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    match args.command {
        Command::Process { pretty } => process(pretty).await,
        Command::Scrub => scrub().await,
    }
}
