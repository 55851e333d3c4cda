//! PackMap Inspect Binary
//!
//! Examines and rewrites packed buffer files with raw byte values.

use std::path::PathBuf;
use std::process;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use packmap::{Config, PackMap, RawCodec};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// PackMap Inspect
#[derive(Parser, Debug)]
#[command(name = "packmap-inspect")]
#[command(about = "Inspect and rewrite packmap buffer files")]
#[command(version)]
struct Args {
    /// Buffer file
    file: PathBuf,

    /// Defer directory parsing until first access
    #[arg(long)]
    lazy: bool,

    /// Verify stored hashes when reading values
    #[arg(long)]
    verify_hashes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print entry and size counters
    Stats,

    /// List every entry with its record location and stored hash
    List,

    /// Check that records tile the content region
    Verify,

    /// Print one value
    Get {
        /// The identifier to look up
        id: Uuid,
    },

    /// Re-encode every entry into a fresh file
    Rewrite {
        /// Output file
        output: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,packmap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .lazy_directory(args.lazy)
        .verify_hashes(args.verify_hashes)
        .build();

    let map = match PackMap::open(&args.file, RawCodec, config) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", args.file.display(), e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&map, args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(map: &PackMap<Bytes>, command: Commands) -> packmap::Result<()> {
    match command {
        Commands::Stats => {
            let stats = map.stats();
            println!("entries:       {}", stats.entries);
            println!("header bytes:  {}", stats.header_bytes);
            println!("content bytes: {}", stats.content_bytes);
            println!("buffer bytes:  {}", stats.buffer_bytes);
            println!("hash:          {:08x}", map.equivalent_hash()?);
        }
        Commands::List => {
            for id in map.keys() {
                let Some(descriptor) = map.descriptor(&id) else {
                    continue;
                };
                let hash = map.value_hash(&id)?.unwrap_or_default();
                println!(
                    "{}  size={:<8} offset={:<10} hash={:08x}",
                    id,
                    descriptor.size(),
                    descriptor.offset(),
                    hash
                );
            }
        }
        Commands::Verify => {
            map.verify()?;
            for id in map.keys() {
                map.get(&id)?;
            }
            println!("ok: {} entries", map.len());
        }
        Commands::Get { id } => match map.get(&id)? {
            Some(value) => println!("{}", render(&value)),
            None => {
                println!("(no value)");
            }
        },
        Commands::Rewrite { output } => {
            let rewritten = map.force_modified()?;
            rewritten.write_to(&output)?;
            tracing::info!(
                "Wrote {} entries to {}",
                rewritten.len(),
                output.display()
            );
        }
    }
    Ok(())
}

/// UTF-8 when valid, hex otherwise
fn render(value: &[u8]) -> String {
    match std::str::from_utf8(value) {
        Ok(s) => s.to_string(),
        Err(_) => value.iter().map(|b| format!("{:02x}", b)).collect(),
    }
}
