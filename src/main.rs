use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use hkey_perf_data::prelude::*;

/// Dump performance objects and counters from a raw HKEY_PERFORMANCE_DATA snapshot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Only decode objects with this name (may be repeated)
    #[arg(short, long = "object", value_name = "NAME")]
    objects: Vec<String>,

    /// Saved snapshot blob ("Global" value) to decode instead of the live registry
    #[arg(long, requires = "names")]
    snapshot: Option<PathBuf>,

    /// Saved name table blob ("Counter" value, UTF-16LE)
    #[arg(long, requires = "snapshot")]
    names: Option<PathBuf>,

    /// Print raw counter values, without unit conversion
    #[arg(long)]
    raw: bool,

    /// Use English counter names instead of the user's UI language
    #[cfg(windows)]
    #[arg(long)]
    english: bool,

    /// Largest buffer to try for the live snapshot, in bytes
    #[cfg(windows)]
    #[arg(long, value_name = "BYTES")]
    max_buffer: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = ReaderConfig::default();
    if !args.objects.is_empty() {
        config = config.with_whitelist(args.objects.iter().cloned());
    }

    let provider = provider(&args)?;
    let mut reader = PerfDataReader::new(provider, config);
    let raw = reader.read_raw().context("reading performance data")?;
    let objects = if args.raw {
        raw.into_unconverted()
    } else {
        raw.into_converted()
    };

    info!("Decoded {} objects", objects.len());
    print!("{}", objects);
    Ok(())
}

fn provider(args: &Args) -> Result<Box<dyn BlobProvider>> {
    if let (Some(snapshot), Some(names)) = (&args.snapshot, &args.names) {
        let snapshot = fs::read(snapshot)
            .with_context(|| format!("reading snapshot {}", snapshot.display()))?;
        let names =
            fs::read(names).with_context(|| format!("reading name table {}", names.display()))?;
        return Ok(Box::new(StaticBlobs::new(snapshot, names)));
    }
    live_provider(args)
}

#[cfg(windows)]
fn live_provider(args: &Args) -> Result<Box<dyn BlobProvider>> {
    let mut config = ProviderConfig {
        english_names: args.english,
        ..ProviderConfig::default()
    };
    if let Some(max) = args.max_buffer {
        config.growth.max_size = max;
    }
    Ok(Box::new(RegistryBlobs::new(config)))
}

#[cfg(not(windows))]
fn live_provider(_args: &Args) -> Result<Box<dyn BlobProvider>> {
    anyhow::bail!("live registry is only available on Windows, use --snapshot and --names")
}
