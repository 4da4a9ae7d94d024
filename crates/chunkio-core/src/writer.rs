//! Chunk writer — emits nested chunks and back-patches their sizes.
//!
//! Every chunk starts life as a placeholder header with a zero size. Payload
//! writes grow the size of the innermost open chunk; closing a chunk seeks
//! back to its header, rewrites it with the final size, folds the total into
//! the parent and returns to where writing left off.

use std::io::SeekFrom;

use zerocopy::AsBytes;

use crate::config::ChunkConfig;
use crate::stream::ByteSink;
use crate::wire::{ChunkError, ChunkHeader, WireRecord, HEADER_SIZE, MAX_CHUNK_SIZE};

/// One open chunk: where its header lives and what it will say.
#[derive(Debug, Clone, Copy)]
struct WriteFrame {
    offset: u64,
    header: ChunkHeader,
}

/// Writes a chunk hierarchy into a seekable sink.
///
/// Calling the API out of order (ending a chunk that is not open, nesting
/// past the depth limit, opening a second micro-chunk) is a caller bug and
/// panics. Stream failures come back as [`ChunkError`] and leave the
/// writer's bookkeeping as it was before the call.
pub struct ChunkWriter<'a, S: ByteSink + ?Sized> {
    sink: &'a mut S,
    stack: Vec<WriteFrame>,
    max_depth: usize,
    micro: Option<WriteFrame>,
}

impl<'a, S: ByteSink + ?Sized> ChunkWriter<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self::with_config(sink, &ChunkConfig::default())
    }

    pub fn with_config(sink: &'a mut S, config: &ChunkConfig) -> Self {
        assert!(config.max_depth > 0, "max_depth must be at least 1");
        Self {
            sink,
            stack: Vec::with_capacity(config.max_depth.min(crate::wire::DEFAULT_MAX_DEPTH)),
            max_depth: config.max_depth,
            micro: None,
        }
    }

    /// Number of chunks currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn in_micro_chunk(&self) -> bool {
        self.micro.is_some()
    }

    /// Payload bytes written so far into the innermost open chunk.
    pub fn cur_chunk_length(&self) -> u32 {
        self.top().header.size()
    }

    /// Start a chunk at the current stream position.
    pub fn begin_chunk(&mut self, type_id: u32) -> Result<(), ChunkError> {
        assert!(
            self.stack.len() < self.max_depth,
            "chunk nesting limit of {} exceeded",
            self.max_depth
        );
        assert!(
            self.micro.is_none(),
            "cannot begin a chunk while a micro-chunk is open"
        );

        // Files produced by the legacy tools clear the parent's nested
        // flag here. Keep that polarity; readers of those files expect it.
        if let Some(parent) = self.stack.last_mut() {
            parent.header.set_contains_chunks(false);
        }

        let header = ChunkHeader::new(type_id);
        let offset = self.sink.tell()?;
        self.put(header.as_bytes())?;
        self.stack.push(WriteFrame { offset, header });

        tracing::trace!(type_id, depth = self.stack.len(), offset, "chunk begun");
        Ok(())
    }

    /// Close the innermost chunk, patching its header with the final size.
    ///
    /// If the rewrite fails the chunk stays open and the stream is left at
    /// the header being rewritten.
    pub fn end_chunk(&mut self) -> Result<(), ChunkError> {
        assert!(
            self.micro.is_none(),
            "cannot end a chunk while a micro-chunk is open"
        );
        let frame = *self.top();
        let total = frame.header.size() + HEADER_SIZE;

        if let Some(parent) = self.stack.len().checked_sub(2).map(|i| &self.stack[i]) {
            if parent.header.size().checked_add(total).map_or(true, |t| t > MAX_CHUNK_SIZE) {
                return Err(ChunkError::ChunkTooLarge);
            }
        }

        let resume = self.sink.tell()?;
        self.sink.seek_to(SeekFrom::Start(frame.offset))?;
        if let Err(e) = self.put(frame.header.as_bytes()) {
            tracing::warn!(type_id = frame.header.type_id(), offset = frame.offset, error = %e, "failed to patch chunk header");
            return Err(e);
        }

        self.stack.pop();
        if let Some(parent) = self.stack.last_mut() {
            parent.header.add_size(total);
        }
        self.sink.seek_to(SeekFrom::Start(resume))?;

        tracing::trace!(
            type_id = frame.header.type_id(),
            size = frame.header.size(),
            depth = self.stack.len(),
            "chunk ended"
        );
        Ok(())
    }

    /// Start a micro-chunk inside the innermost chunk's payload.
    ///
    /// The micro header counts toward the enclosing chunk's size; the
    /// micro-chunk's own size covers only the bytes written after it.
    pub fn begin_micro_chunk(&mut self, type_id: u32) -> Result<(), ChunkError> {
        assert!(self.micro.is_none(), "a micro-chunk is already open");
        assert!(
            !self.top().header.contains_chunks(),
            "micro-chunk inside a chunk flagged as holding nested chunks"
        );

        let header = ChunkHeader::new(type_id);
        let offset = self.sink.tell()?;
        self.write(header.as_bytes())?;
        self.micro = Some(WriteFrame { offset, header });

        tracing::trace!(type_id, offset, "micro-chunk begun");
        Ok(())
    }

    /// Close the open micro-chunk, patching its header with the final size.
    pub fn end_micro_chunk(&mut self) -> Result<(), ChunkError> {
        let micro = match self.micro {
            Some(micro) => micro,
            None => panic!("end_micro_chunk without an open micro-chunk"),
        };

        let resume = self.sink.tell()?;
        self.sink.seek_to(SeekFrom::Start(micro.offset))?;
        if let Err(e) = self.put(micro.header.as_bytes()) {
            tracing::warn!(type_id = micro.header.type_id(), offset = micro.offset, error = %e, "failed to patch micro-chunk header");
            return Err(e);
        }
        self.sink.seek_to(SeekFrom::Start(resume))?;
        self.micro = None;

        tracing::trace!(
            type_id = micro.header.type_id(),
            size = micro.header.size(),
            "micro-chunk ended"
        );
        Ok(())
    }

    /// Append payload bytes to the innermost chunk (and the open
    /// micro-chunk, if any). Returns the number of bytes written.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, ChunkError> {
        let top = self.top();
        assert!(
            !top.header.contains_chunks(),
            "payload write into a chunk flagged as holding nested chunks"
        );

        let len = u32::try_from(bytes.len()).map_err(|_| ChunkError::ChunkTooLarge)?;
        if !fits(&top.header, len) || self.micro.map_or(false, |m| !fits(&m.header, len)) {
            return Err(ChunkError::ChunkTooLarge);
        }

        let written = self.sink.write_bytes(bytes)?;
        if written != bytes.len() {
            tracing::warn!(wanted = bytes.len(), written, "short payload write");
            return Err(ChunkError::ShortWrite {
                wanted: bytes.len(),
                written,
            });
        }

        if let Some(frame) = self.stack.last_mut() {
            frame.header.add_size(len);
        }
        if let Some(micro) = self.micro.as_mut() {
            micro.header.add_size(len);
        }
        Ok(written)
    }

    /// Write a vector or quaternion record byte-for-byte.
    pub fn write_record<T: WireRecord>(&mut self, record: &T) -> Result<usize, ChunkError> {
        self.write(record.as_bytes())
    }

    fn top(&self) -> &WriteFrame {
        match self.stack.last() {
            Some(frame) => frame,
            None => panic!("no chunk is open"),
        }
    }

    /// Raw write outside of size accounting, used for headers.
    fn put(&mut self, bytes: &[u8]) -> Result<(), ChunkError> {
        let written = self.sink.write_bytes(bytes)?;
        if written != bytes.len() {
            return Err(ChunkError::ShortWrite {
                wanted: bytes.len(),
                written,
            });
        }
        Ok(())
    }
}

fn fits(header: &ChunkHeader, len: u32) -> bool {
    header.size().checked_add(len).map_or(false, |t| t <= MAX_CHUNK_SIZE)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
