//! Walking a chunk file into a printable tree.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Serialize;

use chunkio_core::{ByteSource, ChunkError, ChunkReader};

/// How to interpret chunk payloads while walking.
#[derive(Debug, Default)]
pub struct WalkOptions {
    /// Type ids whose payload is a run of nested chunks, beyond those whose
    /// header carries the nested flag.
    pub containers: HashSet<u32>,
    /// Type ids whose payload is a run of micro-chunks.
    pub micro: HashSet<u32>,
    /// Compute a BLAKE3 digest of every leaf payload.
    pub hash: bool,
}

#[derive(Debug, Serialize)]
pub struct DumpNode {
    pub type_id: u32,
    pub size: u32,
    pub nested_flag: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DumpNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub micros: Vec<MicroEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MicroEntry {
    pub type_id: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Read every chunk at the reader's current level.
pub fn walk<S: ByteSource + ?Sized>(
    r: &mut ChunkReader<'_, S>,
    opts: &WalkOptions,
) -> Result<Vec<DumpNode>> {
    let mut nodes = Vec::new();
    loop {
        match r.open_chunk() {
            Ok(()) => {}
            Err(ChunkError::EndOfChunk) => break,
            Err(ChunkError::ShortRead { got: 0, .. }) if r.depth() == 0 => break,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to open chunk at depth {} after {} siblings", r.depth(), nodes.len())
                })
            }
        }

        let type_id = r.cur_chunk_id();
        let mut node = DumpNode {
            type_id,
            size: r.cur_chunk_length(),
            nested_flag: r.contains_chunks(),
            children: Vec::new(),
            micros: Vec::new(),
            digest: None,
        };

        if node.nested_flag || opts.containers.contains(&type_id) {
            node.children = walk(r, opts)?;
        } else if opts.micro.contains(&type_id) {
            node.micros = walk_micro(r, opts)
                .with_context(|| format!("bad micro-chunks in chunk {type_id:#010x}"))?;
        } else if opts.hash {
            node.digest = Some(digest_remaining(r)?);
        }

        r.close_chunk()
            .with_context(|| format!("failed to close chunk {type_id:#010x}"))?;
        tracing::debug!(type_id, size = node.size, depth = r.depth(), "chunk walked");
        nodes.push(node);
    }
    Ok(nodes)
}

fn walk_micro<S: ByteSource + ?Sized>(
    r: &mut ChunkReader<'_, S>,
    opts: &WalkOptions,
) -> Result<Vec<MicroEntry>> {
    let mut entries = Vec::new();
    while r.remaining() > 0 {
        r.open_micro_chunk()?;
        let digest = if opts.hash {
            Some(digest_remaining(r)?)
        } else {
            None
        };
        entries.push(MicroEntry {
            type_id: r.cur_micro_chunk_id(),
            size: r.cur_micro_chunk_length(),
            digest,
        });
        r.close_micro_chunk()?;
    }
    Ok(entries)
}

const DIGEST_BLOCK: usize = 64 * 1024;

/// Hash the rest of the current region in fixed-size blocks.
fn digest_remaining<S: ByteSource + ?Sized>(r: &mut ChunkReader<'_, S>) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut block = vec![0u8; DIGEST_BLOCK.min(r.remaining() as usize)];
    while r.remaining() > 0 {
        let len = block.len().min(r.remaining() as usize);
        r.read(&mut block[..len]).context("failed to read payload")?;
        hasher.update(&block[..len]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Box-drawn listing, one line per chunk.
pub fn render(nodes: &[DumpNode]) -> String {
    let mut out = String::new();
    render_level(nodes, "", &mut out);
    out
}

fn render_level(nodes: &[DumpNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└─" } else { "├─" };
        let flag = if node.nested_flag { " [nested]" } else { "" };
        out.push_str(&format!(
            "{prefix}{branch} {:#010x}  {} bytes{flag}",
            node.type_id, node.size
        ));
        if let Some(digest) = &node.digest {
            out.push_str(&format!("  blake3:{}", &digest[..16]));
        }
        out.push('\n');

        let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
        for micro in &node.micros {
            out.push_str(&format!(
                "{child_prefix}· micro {:#06x}  {} bytes",
                micro.type_id, micro.size
            ));
            if let Some(digest) = &micro.digest {
                out.push_str(&format!("  blake3:{}", &digest[..16]));
            }
            out.push('\n');
        }
        render_level(&node.children, &child_prefix, out);
    }
}
