//! CLI tool for inspecting framed buffers and schema descriptors.
//!
//! Provides commands for:
//! - Listing the length-prefixed frames of an encoded file
//! - Printing a schema descriptor with its fingerprint
//! - Checking that a file holds whole instances of a schema

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_codec_core::wire::{check_layout, inspect_frames, FRAME_PREFIX_LEN};
use schema_codec_core::Schema;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the frames of an encoded file
    Frames {
        /// Encoded file
        file: PathBuf,

        /// Offset of the first length prefix
        #[arg(short, long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of frames to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the members and fingerprint of a schema descriptor (JSON)
    Schema {
        /// Schema descriptor
        schema: PathBuf,
    },

    /// Check that a file holds a whole number of instances of a schema
    Check {
        /// Encoded file
        file: PathBuf,

        /// Schema descriptor (JSON)
        #[arg(short, long)]
        schema: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let report = run(&cli.command)?;
    print!("{}", report);
    Ok(())
}

fn run(command: &Commands) -> Result<String> {
    match command {
        Commands::Frames {
            file,
            offset,
            limit,
        } => {
            let bytes = read_file(file)?;
            frames_report(&bytes, *offset, *limit)
        }
        Commands::Schema { schema } => Ok(schema_report(&load_schema(schema)?)),
        Commands::Check { file, schema } => {
            let bytes = read_file(file)?;
            let schema = load_schema(schema)?;
            check_report(&bytes, &schema)
                .with_context(|| format!("{} does not match the schema", file.display()))
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn load_schema(path: &Path) -> Result<Schema> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    Schema::from_json_str(&json)
        .with_context(|| format!("Failed to parse schema {}", path.display()))
}

fn frames_report(bytes: &[u8], offset: usize, limit: Option<usize>) -> Result<String> {
    let frames = inspect_frames(bytes, offset, limit)?;
    let mut out = String::new();
    writeln!(out, "{:>5}  {:>10}  {:>10}", "#", "offset", "length")?;
    for (i, frame) in frames.iter().enumerate() {
        writeln!(out, "{:>5}  {:>10}  {:>10}", i, frame.offset, frame.len)?;
    }
    let end = frames.last().map_or(offset, |f| f.end());
    writeln!(
        out,
        "{} frames, {} payload bytes, ends at {}",
        frames.len(),
        frames.iter().map(|f| f.len).sum::<usize>(),
        end
    )?;
    Ok(out)
}

fn schema_report(schema: &Schema) -> String {
    let mut out = format!(
        "{} ({}) fingerprint {:08x}\n",
        schema.type_id(),
        if schema.is_primary() {
            "primary"
        } else {
            "historical"
        },
        schema.fingerprint()
    );
    for (i, member) in schema.members().enumerate() {
        let skip = if member.is_skip { "  skip" } else { "" };
        out.push_str(&format!(
            "{:>3}  {}: {}{}\n",
            i, member.name, member.type_id, skip
        ));
    }
    out
}

fn check_report(bytes: &[u8], schema: &Schema) -> Result<String> {
    let instances = check_layout(bytes, schema)?;
    let overhead = instances * schema.len() * FRAME_PREFIX_LEN;
    Ok(format!(
        "{} instances of {} in {} bytes ({} bytes of length prefixes)\n",
        instances,
        schema.type_id(),
        bytes.len(),
        overhead
    ))
}
