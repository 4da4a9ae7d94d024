//! chunkio-dump — print the chunk hierarchy of a W3D chunk file.

use std::collections::HashSet;
use std::io::Cursor;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;

use chunkio_core::{BiasedStream, ByteSource, ChunkConfig, ChunkReader};

mod tree;

use tree::WalkOptions;

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Args {
    path: Option<String>,
    offset: u64,
    length: Option<u64>,
    json: bool,
    walk: WalkOptions,
}

/// Accepts `0x`-prefixed hex or decimal.
fn parse_number(text: &str) -> Result<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    }
    .with_context(|| format!("not a number: {text}"))
}

fn parse_id(text: &str) -> Result<u32> {
    let value = parse_number(text)?;
    u32::try_from(value).with_context(|| format!("chunk id out of range: {text}"))
}

fn insert_ids(set: &mut HashSet<u32>, value: Option<&String>, flag: &str) -> Result<()> {
    let value = value.with_context(|| format!("{flag} requires a value"))?;
    for part in value.split(',') {
        set.insert(parse_id(part.trim())?);
    }
    Ok(())
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::default();
    let mut i = 0;
    while i < raw.len() {
        match raw[i].as_str() {
            "--offset" => {
                i += 1;
                args.offset = parse_number(raw.get(i).context("--offset requires a value")?)?;
            }
            "--length" => {
                i += 1;
                args.length = Some(parse_number(raw.get(i).context("--length requires a value")?)?);
            }
            "--container" => {
                i += 1;
                insert_ids(&mut args.walk.containers, raw.get(i), "--container")?;
            }
            "--micro" => {
                i += 1;
                insert_ids(&mut args.walk.micro, raw.get(i), "--micro")?;
            }
            "--hash" => args.walk.hash = true,
            "--json" => args.json = true,
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => {
                if args.path.is_some() {
                    bail!("unexpected argument: {other}");
                }
                args.path = Some(other.to_string());
            }
        }
        i += 1;
    }
    Ok(args)
}

fn print_usage() {
    println!("Usage: chunkio-dump [options] <file>");
    println!();
    println!("Options:");
    println!("  --offset <n>        Start of the chunk data inside the file (default: 0)");
    println!("  --length <n>        Length of the chunk data (default: to end of file)");
    println!("  --container <ids>   Comma-separated chunk ids whose payload is nested chunks");
    println!("  --micro <ids>       Comma-separated chunk ids whose payload is micro-chunks");
    println!("  --hash              Print a BLAKE3 digest of every leaf payload");
    println!("  --json              Emit the tree as JSON");
    println!();
    println!("Chunks whose header carries the nested flag are always descended into.");
}

// ── Dump ──────────────────────────────────────────────────────────────────────

fn dump<S: ByteSource>(source: &mut S, config: &ChunkConfig, args: &Args) -> Result<()> {
    let mut reader = ChunkReader::with_config(source, config);
    let nodes = tree::walk(&mut reader, &args.walk)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
    } else if nodes.is_empty() {
        println!("No chunks.");
    } else {
        print!("{}", tree::render(&nodes));
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.is_empty() || raw.iter().any(|a| a == "--help" || a == "-h" || a == "help") {
        print_usage();
        return Ok(());
    }

    let args = parse_args(&raw)?;
    let path = match &args.path {
        Some(path) => path.clone(),
        None => {
            eprintln!("Missing file argument.");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let config = ChunkConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ChunkConfig::default()
    });

    let file = std::fs::File::open(&path).with_context(|| format!("failed to open {path}"))?;

    // Safety: the file is opened read-only and the map is never mutated
    let map = unsafe { Mmap::map(&file).with_context(|| format!("failed to mmap {path}"))? };
    let file_len = map.len() as u64;
    tracing::info!(path = %path, bytes = file_len, "mapped chunk file");

    if args.offset > file_len {
        bail!("offset {} is past the end of {path} ({file_len} bytes)", args.offset);
    }
    let length = args.length.unwrap_or(file_len - args.offset);

    let mut cursor = Cursor::new(&map[..]);
    if args.offset == 0 && length == file_len {
        dump(&mut cursor, &config, &args)
    } else {
        let mut window = BiasedStream::new(cursor, args.offset, length)?;
        dump(&mut window, &config, &args)
    }
}
