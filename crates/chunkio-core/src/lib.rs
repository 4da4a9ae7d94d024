//! chunkio-core — reader and writer for the W3D hierarchical chunk format.
//!
//! A chunk file is a sequence of chunks, each an 8-byte header followed by
//! its payload; a payload is either raw bytes (optionally carved into
//! micro-chunks) or further chunks. There is no index: the hierarchy is
//! rebuilt from header sizes alone, so the writer back-patches sizes and
//! the reader refuses to step outside them.

pub mod config;
pub mod reader;
pub mod stream;
pub mod wire;
pub mod writer;

pub use config::{ChunkConfig, RecordReadMode};
pub use reader::ChunkReader;
pub use stream::{BiasedStream, ByteSink, ByteSource, Seekable};
pub use wire::{ChunkError, ChunkHeader, IoQuaternion, IoVector2, IoVector3, IoVector4, WireRecord};
pub use writer::ChunkWriter;
