//! chunkio wire format — the on-disk records shared by the writer and reader.
//!
//! These types ARE the file format. Every field and every size is consumed
//! by other tools that read W3D chunk files, so nothing here may change
//! layout. Values are stored in native byte order with no padding.
//!
//! All types are #[repr(C)] for deterministic layout and use zerocopy
//! derives for safe, allocation-free serialization. There is no unsafe
//! code in this module.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Chunk Header ─────────────────────────────────────────────────────────────

/// Header preceding every chunk and micro-chunk.
///
/// The reader reconstructs the whole hierarchy from these headers alone:
/// there is no index or footer, a sibling starts right after the last
/// payload byte of the previous one.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct ChunkHeader {
    /// Application-defined chunk type. The codec never inspects it.
    type_id: u32,

    /// Payload length in bits 30..0.
    /// Bit 31 flags a payload made of nested chunks rather than raw bytes.
    size_and_flag: u32,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(ChunkHeader, [u8; 8]);

impl ChunkHeader {
    /// A fresh header with a zero size and the nested flag clear.
    pub fn new(type_id: u32) -> Self {
        Self {
            type_id,
            size_and_flag: 0,
        }
    }

    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Payload size in bytes, excluding this header.
    pub fn size(&self) -> u32 {
        self.size_and_flag & SIZE_MASK
    }

    /// Replace the size, keeping the nested flag.
    pub fn set_size(&mut self, size: u32) {
        self.size_and_flag = (self.size_and_flag & NESTED_FLAG) | (size & SIZE_MASK);
    }

    /// Grow the size by `bytes`. Returns `false` and leaves the header
    /// untouched if the result would not fit in the 31-bit size field.
    pub fn add_size(&mut self, bytes: u32) -> bool {
        match self.size().checked_add(bytes) {
            Some(total) if total <= MAX_CHUNK_SIZE => {
                self.set_size(total);
                true
            }
            _ => false,
        }
    }

    /// Whether the payload is a sequence of nested chunks.
    pub fn contains_chunks(&self) -> bool {
        self.size_and_flag & NESTED_FLAG != 0
    }

    pub fn set_contains_chunks(&mut self, nested: bool) {
        if nested {
            self.size_and_flag |= NESTED_FLAG;
        } else {
            self.size_and_flag &= SIZE_MASK;
        }
    }

    /// Raw size field, flag bit included.
    pub fn size_and_flag(&self) -> u32 {
        self.size_and_flag
    }

    /// Build a header from its two raw wire fields.
    pub fn from_raw(type_id: u32, size_and_flag: u32) -> Self {
        Self {
            type_id,
            size_and_flag,
        }
    }
}

// ── Wire Records ─────────────────────────────────────────────────────────────

/// Fixed-size records written byte-for-byte into a chunk payload.
///
/// Implemented only for the vector and quaternion records below. Their
/// read length depends on [`RecordReadMode`](crate::config::RecordReadMode).
pub trait WireRecord: AsBytes + FromBytes + FromZeroes {}

/// Two-component float vector. Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct IoVector2 {
    pub x: f32,
    pub y: f32,
}

assert_eq_size!(IoVector2, [u8; 8]);

/// Three-component float vector. Wire size: 12 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct IoVector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

assert_eq_size!(IoVector3, [u8; 12]);

/// Four-component float vector. Wire size: 16 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct IoVector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

assert_eq_size!(IoVector4, [u8; 16]);

/// Rotation quaternion, stored as four floats. Wire size: 16 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct IoQuaternion {
    pub q: [f32; 4],
}

assert_eq_size!(IoQuaternion, [u8; 16]);

impl WireRecord for IoVector2 {}
impl WireRecord for IoVector3 {}
impl WireRecord for IoVector4 {}
impl WireRecord for IoQuaternion {}

// ── Constants ─────────────────────────────────────────────────────────────────

/// Size of a [`ChunkHeader`] on the wire.
pub const HEADER_SIZE: u32 = 8;

/// Bit 31 of the size field: payload holds nested chunks.
pub const NESTED_FLAG: u32 = 0x8000_0000;

/// Bits 30..0 of the size field.
pub const SIZE_MASK: u32 = 0x7FFF_FFFF;

/// Largest payload a single chunk can declare.
pub const MAX_CHUNK_SIZE: u32 = SIZE_MASK;

/// Default nesting limit for writers and readers.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Bytes read for a record in legacy mode. The tools that wrote the
/// legacy files were 32-bit builds that sized these reads from a pointer.
pub const LEGACY_RECORD_READ_LEN: usize = 4;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Data and I/O failures. Misuse of the writer or reader state machine is
/// not reported here: it panics.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    #[error("short write: wanted {wanted} bytes, wrote {written}")]
    ShortWrite { wanted: usize, written: usize },

    #[error("short seek: wanted to move {wanted} bytes, moved {moved}")]
    ShortSeek { wanted: u64, moved: u64 },

    #[error("request for {requested} bytes exceeds the {remaining} bytes left in the region")]
    OutOfBounds { requested: usize, remaining: usize },

    #[error("no more chunks inside the enclosing chunk")]
    EndOfChunk,

    #[error("chunk nesting limit of {0} reached")]
    DepthExhausted(usize),

    #[error("a micro-chunk is open")]
    MicroChunkActive,

    #[error("chunk declares {declared} bytes but only {remaining} remain in its parent")]
    ChunkOverrun { declared: u64, remaining: u32 },

    #[error("micro-chunk declares {declared} bytes but only {remaining} remain in its chunk")]
    MicroChunkOverrun { declared: u32, remaining: u32 },

    #[error("chunk would grow past {} bytes", MAX_CHUNK_SIZE)]
    ChunkTooLarge,

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
