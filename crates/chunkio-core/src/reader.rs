//! Chunk reader — walks a chunk hierarchy with strict containment.
//!
//! The reader trusts nothing but the headers. Each open chunk remembers how
//! many of its declared bytes have been consumed; reads and seeks that would
//! cross the end of the chunk (or of the open micro-chunk) are refused before
//! touching the stream, and closing a chunk skips whatever the caller left
//! unread so the stream lands on the next sibling.

use std::io::SeekFrom;

use zerocopy::AsBytes;

use crate::config::{ChunkConfig, RecordReadMode};
use crate::stream::ByteSource;
use crate::wire::{ChunkError, ChunkHeader, WireRecord, HEADER_SIZE, LEGACY_RECORD_READ_LEN};

/// One open region: its header and how much of it has been consumed.
#[derive(Debug, Clone, Copy)]
struct ReadFrame {
    consumed: u32,
    header: ChunkHeader,
}

impl ReadFrame {
    fn remaining(&self) -> u32 {
        self.header.size().saturating_sub(self.consumed)
    }
}

/// Reads a chunk hierarchy from a seekable source.
///
/// Misuse of the API (closing what is not open, reading with no chunk open)
/// panics. Truncated or malformed input comes back as [`ChunkError`] with the
/// reader's bookkeeping unchanged.
pub struct ChunkReader<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    stack: Vec<ReadFrame>,
    max_depth: usize,
    micro: Option<ReadFrame>,
    record_read: RecordReadMode,
}

impl<'a, S: ByteSource + ?Sized> ChunkReader<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self::with_config(source, &ChunkConfig::default())
    }

    pub fn with_config(source: &'a mut S, config: &ChunkConfig) -> Self {
        assert!(config.max_depth > 0, "max_depth must be at least 1");
        Self {
            source,
            stack: Vec::with_capacity(config.max_depth.min(crate::wire::DEFAULT_MAX_DEPTH)),
            max_depth: config.max_depth,
            micro: None,
            record_read: config.record_read,
        }
    }

    /// Number of chunks currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn in_micro_chunk(&self) -> bool {
        self.micro.is_some()
    }

    /// Read the next chunk header and make that chunk current.
    ///
    /// Fails without changing state when a micro-chunk is open, when the
    /// enclosing chunk has no room for a header, when the depth limit is
    /// reached, or when the stream ends before a full header. A header whose
    /// chunk would end past its parent is rejected and the stream is moved
    /// back before it.
    pub fn open_chunk(&mut self) -> Result<(), ChunkError> {
        if self.micro.is_some() {
            return Err(ChunkError::MicroChunkActive);
        }
        let parent_remaining = self.stack.last().map(ReadFrame::remaining);
        match parent_remaining {
            Some(0) => return Err(ChunkError::EndOfChunk),
            Some(remaining) if remaining < HEADER_SIZE => {
                tracing::debug!(remaining, "parent too short for a chunk header");
                return Err(ChunkError::OutOfBounds {
                    requested: HEADER_SIZE as usize,
                    remaining: remaining as usize,
                });
            }
            _ => {}
        }
        if self.stack.len() >= self.max_depth {
            return Err(ChunkError::DepthExhausted(self.max_depth));
        }

        let mut header = ChunkHeader::default();
        let got = self.source.read_bytes(header.as_bytes_mut())?;
        if got != HEADER_SIZE as usize {
            return Err(ChunkError::ShortRead {
                wanted: HEADER_SIZE as usize,
                got,
            });
        }

        if let Some(remaining) = parent_remaining {
            let declared = u64::from(header.size()) + u64::from(HEADER_SIZE);
            if declared > u64::from(remaining) {
                self.source.seek_to(SeekFrom::Current(-(HEADER_SIZE as i64)))?;
                tracing::debug!(
                    type_id = header.type_id(),
                    declared,
                    remaining,
                    "chunk overruns its parent"
                );
                return Err(ChunkError::ChunkOverrun { declared, remaining });
            }
        }

        self.stack.push(ReadFrame {
            consumed: 0,
            header,
        });
        tracing::trace!(
            type_id = header.type_id(),
            size = header.size(),
            depth = self.stack.len(),
            "chunk opened"
        );
        Ok(())
    }

    /// Leave the current chunk, skipping any unread payload.
    ///
    /// The chunk is always closed. An error means the skip did not land
    /// where the header said the next sibling starts.
    pub fn close_chunk(&mut self) -> Result<(), ChunkError> {
        assert!(
            self.micro.is_none(),
            "cannot close a chunk while a micro-chunk is open"
        );
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => panic!("close_chunk without an open chunk"),
        };

        let skipped = match frame.remaining() {
            0 => Ok(()),
            rest => self.skip(rest),
        };

        let size = frame.header.size();
        if let Some(parent) = self.stack.last_mut() {
            parent.consumed = parent.consumed.saturating_add(size + HEADER_SIZE);
        }

        if let Err(e) = &skipped {
            tracing::warn!(type_id = frame.header.type_id(), error = %e, "failed to skip chunk remainder");
        }
        tracing::trace!(type_id = frame.header.type_id(), depth = self.stack.len(), "chunk closed");
        skipped
    }

    pub fn cur_chunk_id(&self) -> u32 {
        self.top().header.type_id()
    }

    /// Declared payload size of the current chunk.
    pub fn cur_chunk_length(&self) -> u32 {
        self.top().header.size()
    }

    /// Whether the current chunk's header carries the nested-chunks flag.
    pub fn contains_chunks(&self) -> bool {
        self.top().header.contains_chunks()
    }

    /// Bytes left before the innermost region (micro-chunk if open) ends.
    pub fn remaining(&self) -> u32 {
        let chunk = self.top().remaining();
        match self.micro {
            Some(micro) => chunk.min(micro.remaining()),
            None => chunk,
        }
    }

    /// Read a micro-chunk header from the current chunk's payload.
    ///
    /// The header bytes count as consumed payload of the chunk. A micro
    /// header claiming more bytes than the chunk has left is rejected and
    /// the stream is moved back before it.
    pub fn open_micro_chunk(&mut self) -> Result<(), ChunkError> {
        assert!(self.micro.is_none(), "a micro-chunk is already open");

        let mut header = ChunkHeader::default();
        self.read(header.as_bytes_mut())?;

        let remaining = self.top().remaining();
        if header.size() > remaining {
            self.source.seek_to(SeekFrom::Current(-(HEADER_SIZE as i64)))?;
            self.top_mut().consumed -= HEADER_SIZE;
            tracing::debug!(
                type_id = header.type_id(),
                declared = header.size(),
                remaining,
                "micro-chunk overruns its chunk"
            );
            return Err(ChunkError::MicroChunkOverrun {
                declared: header.size(),
                remaining,
            });
        }

        self.micro = Some(ReadFrame {
            consumed: 0,
            header,
        });
        tracing::trace!(type_id = header.type_id(), size = header.size(), "micro-chunk opened");
        Ok(())
    }

    /// Leave the open micro-chunk, skipping its unread bytes.
    pub fn close_micro_chunk(&mut self) -> Result<(), ChunkError> {
        let micro = match self.micro.take() {
            Some(micro) => micro,
            None => panic!("close_micro_chunk without an open micro-chunk"),
        };

        match micro.remaining() {
            0 => Ok(()),
            rest => {
                let skipped = self.skip(rest);
                if let Some(top) = self.stack.last_mut() {
                    top.consumed = top.consumed.saturating_add(rest);
                }
                skipped
            }
        }
    }

    pub fn cur_micro_chunk_id(&self) -> u32 {
        self.top_micro().header.type_id()
    }

    pub fn cur_micro_chunk_length(&self) -> u32 {
        self.top_micro().header.size()
    }

    /// Move forward `bytes` within the current region.
    pub fn seek(&mut self, bytes: usize) -> Result<usize, ChunkError> {
        let len = self.check_bounds(bytes)?;
        self.skip(len)?;
        self.advance(len);
        Ok(bytes)
    }

    /// Fill `buf` from the current region.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChunkError> {
        let len = self.check_bounds(buf.len())?;
        let got = self.source.read_bytes(buf)?;
        if got != buf.len() {
            return Err(ChunkError::ShortRead {
                wanted: buf.len(),
                got,
            });
        }
        self.advance(len);
        Ok(got)
    }

    /// Read a vector or quaternion record.
    ///
    /// In [`RecordReadMode::Legacy`] only the first 4 bytes of the record are
    /// read, as the legacy loaders did by sizing the read from a pointer.
    /// That leaves the stream misaligned with what the writer emitted; use
    /// [`RecordReadMode::Exact`] for files that need whole records back.
    pub fn read_record<T: WireRecord>(&mut self, record: &mut T) -> Result<usize, ChunkError> {
        let len = match self.record_read {
            RecordReadMode::Exact => std::mem::size_of::<T>(),
            RecordReadMode::Legacy => LEGACY_RECORD_READ_LEN.min(std::mem::size_of::<T>()),
        };
        self.read(&mut record.as_bytes_mut()[..len])
    }

    /// Refuse requests that cross the end of the chunk or micro-chunk.
    fn check_bounds(&self, requested: usize) -> Result<u32, ChunkError> {
        let remaining = self.remaining();
        match u32::try_from(requested) {
            Ok(len) if len <= remaining => Ok(len),
            _ => {
                tracing::debug!(requested, remaining, "read past region boundary refused");
                Err(ChunkError::OutOfBounds {
                    requested,
                    remaining: remaining as usize,
                })
            }
        }
    }

    fn advance(&mut self, len: u32) {
        self.top_mut().consumed += len;
        if let Some(micro) = self.micro.as_mut() {
            micro.consumed += len;
        }
    }

    fn skip(&mut self, len: u32) -> Result<(), ChunkError> {
        let from = self.source.tell()?;
        let to = self.source.seek_to(SeekFrom::Current(i64::from(len)))?;
        let moved = to.saturating_sub(from);
        if moved != u64::from(len) {
            return Err(ChunkError::ShortSeek {
                wanted: u64::from(len),
                moved,
            });
        }
        Ok(())
    }

    fn top(&self) -> &ReadFrame {
        match self.stack.last() {
            Some(frame) => frame,
            None => panic!("no chunk is open"),
        }
    }

    fn top_mut(&mut self) -> &mut ReadFrame {
        match self.stack.last_mut() {
            Some(frame) => frame,
            None => panic!("no chunk is open"),
        }
    }

    fn top_micro(&self) -> &ReadFrame {
        match &self.micro {
            Some(micro) => micro,
            None => panic!("no micro-chunk is open"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
