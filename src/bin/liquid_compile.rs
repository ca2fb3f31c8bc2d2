//! Compiles a protocol file into a timeline of keyed commands.
//!
//! ```text
//! liquid-compile protocol.json --output timeline.json
//! ```

use anyhow::Context;
use clap::Parser;
use liquid_robot::{CompilerConfig, KeyStrategy, ProtocolFile, TimelineCompiler};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "liquid-compile", version, about = "Compile a liquid-handling protocol into device commands")]
struct Args {
    /// Protocol JSON: invariant context, initial deck and steps
    protocol: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the timeline here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deterministic command keys
    #[arg(long)]
    sequential_keys: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CompilerConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CompilerConfig::load().context("loading config from environment")?,
    };
    if args.sequential_keys {
        config.keys = KeyStrategy::Sequential;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let protocol = ProtocolFile::load(&args.protocol)
        .with_context(|| format!("reading protocol {}", args.protocol.display()))?;
    tracing::info!(steps = protocol.steps.len(), "compiling protocol");

    let timeline = TimelineCompiler::new(config).compile_protocol(protocol);
    let failed = timeline.frames.iter().filter(|f| !f.is_ok()).count();
    if failed > 0 {
        tracing::warn!(failed, "some steps did not compile");
    }

    let json = serde_json::to_string_pretty(&timeline).context("serializing timeline")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}
