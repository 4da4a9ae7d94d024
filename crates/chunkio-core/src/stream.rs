//! Seekable byte streams the codec reads from and writes to.
//!
//! The writer needs `write`, the reader needs `read`, and both need
//! absolute, relative and end-relative seeks plus `tell` for back-patching
//! and skipping. Anything implementing the std I/O traits qualifies, so a
//! `File` and an in-memory `Cursor` serve the same contract.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Position control shared by sources and sinks.
pub trait Seekable {
    /// Move the cursor. Returns the new absolute offset.
    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Current absolute offset.
    fn tell(&mut self) -> io::Result<u64> {
        self.seek_to(SeekFrom::Current(0))
    }
}

/// A stream chunks are read from.
pub trait ByteSource: Seekable {
    /// Fill as much of `buf` as the stream allows. Returns the number of
    /// bytes read, which is less than `buf.len()` only at end of stream.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// A stream chunks are written to.
pub trait ByteSink: Seekable {
    /// Write as much of `buf` as the stream accepts. Returns the number of
    /// bytes written, which is less than `buf.len()` only if the stream
    /// stopped accepting data.
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<T: Seek + ?Sized> Seekable for T {
    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek(pos)
    }

    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }
}

impl<T: Read + Seek + ?Sized> ByteSource for T {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

impl<T: Write + Seek + ?Sized> ByteSink for T {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.write(&buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }
}

// ── Bias window ───────────────────────────────────────────────────────────────

/// A window `[start, start + len)` of an inner stream, presented as a
/// complete stream of its own.
///
/// Used to read or write a chunk file that lives inside a larger archive.
/// Offsets seen through the window are relative to `start`; seeks are
/// clamped to the window and reads stop at its end. Writing past the end
/// grows the window.
#[derive(Debug)]
pub struct BiasedStream<S> {
    inner: S,
    start: u64,
    len: u64,
}

impl<S: Seek> BiasedStream<S> {
    /// Wrap `inner` and move its cursor to the start of the window.
    pub fn new(mut inner: S, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self { inner, start, len })
    }

    /// Window length in bytes.
    pub fn window_len(&self) -> u64 {
        self.len
    }

    /// Offset of the window inside the inner stream.
    pub fn window_start(&self) -> u64 {
        self.start
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.inner.stream_position()?.saturating_sub(self.start))
    }
}

impl<S: Seek> Seek for BiasedStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(d) => self.position()? as i128 + d as i128,
            SeekFrom::End(d) => self.len as i128 + d as i128,
        };
        let clamped = target.clamp(0, self.len as i128) as u64;
        self.inner.seek(SeekFrom::Start(self.start + clamped))?;
        Ok(clamped)
    }
}

impl<S: Read + Seek> Read for BiasedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.len.saturating_sub(self.position()?);
        let cap = buf.len().min(usize::try_from(left).unwrap_or(usize::MAX));
        self.inner.read(&mut buf[..cap])
    }
}

impl<S: Write + Seek> Write for BiasedStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        let end = self.position()?;
        if end > self.len {
            self.len = end;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
