//! Windowed, chunk-cached access to the block device or image being checked.
//!
//! Rather than an OS `mmap`, chunks are plain owned buffers read on first
//! touch and written back explicitly. This keeps the "map/sync/unmap" shape
//! of a real mapped-file checker without unsafe aliasing: at most one
//! `Mapping` exists per chunk at a time, tracked by index.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{CheckError, Result};

/// Default chunk size: 1 MiB. Large enough to amortize syscalls for a
/// descriptor-by-descriptor scan, small enough not to balloon memory use
/// when only a handful of chunks are live at once.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

struct Chunk {
    data: Vec<u8>,
    dirty: bool,
}

/// A `Read + Write + Seek` medium, windowed into fixed-size chunks.
pub struct Medium<T> {
    inner: T,
    len: u64,
    readonly: bool,
    chunks: BTreeMap<u64, Chunk>,
}

impl<T: Read + Write + Seek> Medium<T> {
    pub fn open(mut inner: T, readonly: bool) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        if len < 257 * 2048 {
            return Err(CheckError::MediumTooSmall);
        }
        Ok(Self {
            inner,
            len,
            readonly,
            chunks: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn chunk_index(offset: u64) -> u64 {
        offset / CHUNK_SIZE
    }

    fn ensure_mapped(&mut self, index: u64) -> Result<()> {
        if self.chunks.contains_key(&index) {
            return Ok(());
        }
        let start = index * CHUNK_SIZE;
        let size = CHUNK_SIZE.min(self.len.saturating_sub(start)) as usize;
        let mut data = vec![0u8; size];
        self.inner.seek(SeekFrom::Start(start))?;
        self.inner.read_exact(&mut data)?;
        self.chunks.insert(index, Chunk { data, dirty: false });
        Ok(())
    }

    /// Read an exact byte range, crossing chunk boundaries transparently.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        let mut remaining = len;
        let mut pos = offset;
        while remaining > 0 {
            let index = Self::chunk_index(pos);
            self.ensure_mapped(index)?;
            let chunk = self.chunks.get(&index).expect("just mapped");
            let chunk_off = (pos - index * CHUNK_SIZE) as usize;
            let take = remaining.min(chunk.data.len() - chunk_off);
            if take == 0 {
                return Err(CheckError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "read past end of medium",
                )));
            }
            out.extend_from_slice(&chunk.data[chunk_off..chunk_off + take]);
            pos += take as u64;
            remaining -= take;
        }
        Ok(out)
    }

    /// Write bytes at `offset`, marking affected chunks dirty. Callers are
    /// responsible for calling [`Medium::sync_all`] (or letting `Drop` do
    /// it) to make the write durable.
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        if self.readonly {
            return Err(CheckError::UnsupportedStructure(
                "write attempted on a read-only medium",
            ));
        }
        let mut remaining = bytes;
        let mut pos = offset;
        while !remaining.is_empty() {
            let index = Self::chunk_index(pos);
            self.ensure_mapped(index)?;
            let chunk = self.chunks.get_mut(&index).expect("just mapped");
            let chunk_off = (pos - index * CHUNK_SIZE) as usize;
            let take = remaining.len().min(chunk.data.len() - chunk_off);
            chunk.data[chunk_off..chunk_off + take].copy_from_slice(&remaining[..take]);
            chunk.dirty = true;
            remaining = &remaining[take..];
            pos += take as u64;
        }
        Ok(())
    }

    pub fn sync(&mut self, index: u64) -> Result<()> {
        if let Some(chunk) = self.chunks.get_mut(&index) {
            if chunk.dirty {
                self.inner.seek(SeekFrom::Start(index * CHUNK_SIZE))?;
                self.inner.write_all(&chunk.data)?;
                chunk.dirty = false;
            }
        }
        Ok(())
    }

    pub fn sync_all(&mut self) -> Result<()> {
        let indices: Vec<u64> = self.chunks.keys().copied().collect();
        for index in indices {
            self.sync(index)?;
        }
        Ok(())
    }

    pub fn unmap(&mut self, index: u64) -> Result<()> {
        self.sync(index)?;
        self.chunks.remove(&index);
        Ok(())
    }
}

impl<T: Read + Write + Seek> Drop for Medium<T> {
    fn drop(&mut self) {
        let _ = self.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_write_roundtrip_across_chunks() {
        let data = vec![0u8; 257 * 2048];
        let mut medium = Medium::open(Cursor::new(data), false).unwrap();
        medium.write_at(100, b"hello").unwrap();
        let read = medium.read_at(100, 5).unwrap();
        assert_eq!(&read, b"hello");
        medium.sync_all().unwrap();
    }

    #[test]
    fn readonly_write_rejected() {
        let data = vec![0u8; 257 * 2048];
        let mut medium = Medium::open(Cursor::new(data), true).unwrap();
        assert!(medium.write_at(0, b"x").is_err());
    }

    #[test]
    fn rejects_undersized_medium() {
        let data = vec![0u8; 100];
        assert!(Medium::open(Cursor::new(data), true).is_err());
    }
}
