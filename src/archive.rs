//! Archive and entry handles: the public surface composing the stream
//! abstraction and the walker into "open an archive, look up an entry,
//! read its decompressed bytes".

use std::io::Read as StdRead;
use std::path::Path;

use crate::deflate::DeflateStream;
use crate::error::Res;
use crate::stream::{BoxStream, FileStream, SliceStream};
use crate::walker::{self, EntryMeta};

#[cfg(feature = "crc32")]
use crate::error::{ErrorBuilder, ErrorKind};

/// Metadata for one entry, as reported to callers (no raw offsets).
#[derive(Debug, Clone)]
pub struct EntryStat {
    pub name: Vec<u8>,
    pub uncompressed_size: u32,
    pub compression_method: u16,
}

impl From<&EntryMeta> for EntryStat {
    fn from(meta: &EntryMeta) -> Self {
        EntryStat {
            name: meta.name.clone(),
            uncompressed_size: meta.uncompressed_size,
            compression_method: meta.compression_method,
        }
    }
}

/// Owns the archive's byte source. Entries are discovered on demand; no
/// central-directory cache is kept.
#[derive(Debug)]
pub struct Archive {
    stream: BoxStream,
}

impl Archive {
    /// Take ownership of an already-open stream as the archive source.
    pub fn open(stream: BoxStream) -> Archive {
        Archive { stream }
    }

    /// Open the file at `path` and use it as the archive source.
    pub fn open_file(path: impl AsRef<Path>) -> Res<Archive> {
        Ok(Archive::open(FileStream::open(path)?))
    }

    /// Visit every entry in file order. `visit` returns `true` to continue,
    /// `false` to stop early.
    pub fn enumerate(&mut self, mut visit: impl FnMut(&EntryStat) -> bool) -> Res<()> {
        walker::walk(&mut self.stream, |meta| visit(&EntryStat::from(meta)))
    }

    /// Look up an entry by exact name match. Not found is a normal `None`,
    /// not an error.
    pub fn stat(&mut self, name: &[u8]) -> Res<Option<EntryStat>> {
        let meta = walker::find(&mut self.stream, |meta| meta.name == name)?;
        Ok(meta.as_ref().map(EntryStat::from))
    }

    /// Open an entry's decompressed payload as a forward-only read handle.
    /// Not found is a normal `None`, not an error.
    pub fn open_entry(&mut self, name: &[u8]) -> Res<Option<EntryHandle>> {
        let Some(meta) = walker::find(&mut self.stream, |meta| meta.name == name)? else {
            log::debug!("entry {:?} not found", String::from_utf8_lossy(name));
            return Ok(None);
        };
        log::debug!(
            "opening entry {:?} at data offset {}",
            String::from_utf8_lossy(name),
            meta.data_offset
        );
        walker::unsupported_method(meta.compression_method)?;

        let mut dup = self.stream.duplicate()?;
        let mut slice = SliceStream::open(&mut dup, meta.data_offset, meta.compressed_size as u64)?;
        let body = if meta.compression_method == 8 {
            DeflateStream::wrap(&mut slice)
        } else {
            slice
        };

        Ok(Some(EntryHandle {
            stream: body,
            expected_size: meta.uncompressed_size as u64,
            bytes_read: 0,
            #[cfg(feature = "crc32")]
            crc: crc32fast::Hasher::new(),
            #[cfg(feature = "crc32")]
            expected_crc: meta.crc32,
        }))
    }

    pub fn close(mut self) {
        crate::stream::close(&mut self.stream);
    }
}

/// A composed, read-only stream over one entry's decompressed payload.
#[derive(Debug)]
pub struct EntryHandle {
    stream: BoxStream,
    expected_size: u64,
    bytes_read: u64,
    #[cfg(feature = "crc32")]
    crc: crc32fast::Hasher,
    #[cfg(feature = "crc32")]
    expected_crc: u32,
}

impl EntryHandle {
    /// Bytes copied, or 0 at EOF. Mirrors the generalized-file `read` op.
    pub fn read(&mut self, buf: &mut [u8]) -> Res<usize> {
        let n = self.stream.read(buf)?;
        self.bytes_read += n as u64;
        #[cfg(feature = "crc32")]
        self.crc.update(&buf[..n]);
        Ok(n)
    }

    /// The uncompressed size declared in the entry's local file header.
    pub fn declared_size(&self) -> u64 {
        self.expected_size
    }

    /// Bytes delivered to callers so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    #[cfg(feature = "crc32")]
    pub fn verify_crc32(&self) -> Res<()> {
        let actual = self.crc.clone().finalize();
        if actual != self.expected_crc {
            return Err(ErrorBuilder::msg(
                ErrorKind::Crc32Mismatch,
                format!("CRC-32 mismatch: expected {:08x}, got {:08x}", self.expected_crc, actual),
            )
            .into());
        }
        Ok(())
    }

    pub fn close(&mut self) {
        crate::stream::close(&mut self.stream);
    }
}

impl StdRead for EntryHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        EntryHandle::read(self, buf).map_err(std::io::Error::from)
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        crate::stream::close(&mut self.stream);
    }
}

impl Drop for EntryHandle {
    fn drop(&mut self) {
        crate::stream::close(&mut self.stream);
    }
}
