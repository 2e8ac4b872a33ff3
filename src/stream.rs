//! The "generalized file" abstraction: a byte source with four operations
//! (read, seek, duplicate, close) shared by every concrete stream kind this
//! crate composes together to expose a ZIP entry's data.

use crate::error::{ErrorBuilder, ErrorContext, ErrorKind, Res, WithContext};
use std::fmt::Debug;
use std::fs::File;
use std::io::{Read as StdRead, Seek as StdSeek, SeekFrom};
use std::mem;
use std::path::{Path, PathBuf};

/// An owned, dynamically-dispatched stream. Every holder of a `BoxStream`
/// owns it exclusively; moving it into a wrapper must leave the source slot
/// holding a [`NullStream`] (see [`take`]).
pub type BoxStream = Box<dyn Stream + Send>;

/// Four operations, uniform across every concrete instance.
pub trait Stream: Debug {
    /// Copy up to `buf.len()` bytes into `buf`, returning the number copied.
    /// Fewer bytes than requested means end of stream; this never blocks on
    /// data that isn't forthcoming.
    fn read(&mut self, buf: &mut [u8]) -> Res<usize>;

    /// Absolute seek. Fails with `OutOfRangeSeek` outside `[0, length]` for
    /// bounded streams, or `NotSeekable` for the DEFLATE adapter.
    fn seek(&mut self, pos: u64) -> Res<()>;

    /// Produce an independent stream over the same underlying data,
    /// positioned at its own start. Fails with `NotDuplicable` for the
    /// DEFLATE adapter.
    fn duplicate(&self) -> Res<BoxStream>;

    /// Release owned resources. Idempotent once the holder has replaced its
    /// slot with a null stream (see [`take`]); calling it twice on the same
    /// object is still safe, it just has nothing left to release.
    fn close(&mut self);
}

/// Take ownership of `*slot`, leaving a [`NullStream`] behind. This is the
/// "move the source into the new wrapper and reset the source to null"
/// pattern: the old slot's `close()` is safe to call even after the move.
pub(crate) fn take(slot: &mut BoxStream) -> BoxStream {
    mem::replace(slot, Box::new(NullStream))
}

/// Close and null-reset a stream slot in one step.
pub(crate) fn close(slot: &mut BoxStream) {
    slot.close();
    *slot = Box::new(NullStream);
}

fn check_off(off: u64, len: u64) -> Res<()> {
    if off > len {
        Err(ErrorBuilder::msg(
            ErrorKind::OutOfRangeSeek,
            format!("seek to {off} is outside [0, {len}]"),
        )
        .into())
    } else {
        Ok(())
    }
}

/// Stateless stream emulating an empty file. Never leaks, even if it is
/// never explicitly closed: the universally safe default for
/// partially-constructed-then-unwound paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStream;

impl Stream for NullStream {
    fn read(&mut self, _buf: &mut [u8]) -> Res<usize> {
        Ok(0)
    }

    fn seek(&mut self, pos: u64) -> Res<()> {
        check_off(pos, 0)
    }

    fn duplicate(&self) -> Res<BoxStream> {
        Ok(Box::new(NullStream))
    }

    fn close(&mut self) {}
}

/// A windowed view `[off, off+len)` over a parent stream, with its own
/// independent position. The parent may be repositioned by every `read`
/// call (this implementation does not cache the parent's position), so
/// callers must not interleave reads against the parent and the slice.
#[derive(Debug)]
pub struct SliceStream {
    parent: BoxStream,
    off: u64,
    len: u64,
    pos: u64,
}

impl SliceStream {
    /// Open `[off, off+len)` of `parent` as a new stream, taking ownership
    /// of `parent`. The parent is seeked to `off` first to validate the
    /// range; if that fails, `parent` is not consumed.
    pub fn open(parent: &mut BoxStream, off: u64, len: u64) -> Res<BoxStream> {
        parent.seek(off)?;
        let parent = take(parent);
        Ok(Box::new(SliceStream {
            parent,
            off,
            len,
            pos: 0,
        }))
    }
}

impl Stream for SliceStream {
    fn read(&mut self, buf: &mut [u8]) -> Res<usize> {
        let avail = self.len - self.pos;
        let want = (buf.len() as u64).min(avail) as usize;
        if want == 0 {
            return Ok(0);
        }
        self.parent.seek(self.off + self.pos)?;
        let n = self.parent.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> Res<()> {
        check_off(pos, self.len)?;
        self.parent.seek(self.off + pos)?;
        self.pos = pos;
        Ok(())
    }

    fn duplicate(&self) -> Res<BoxStream> {
        let mut dup_parent = self.parent.duplicate()?;
        SliceStream::open(&mut dup_parent, self.off, self.len)
    }

    fn close(&mut self) {
        close(&mut self.parent);
    }
}

/// A stream backed by the host filesystem, read with standard buffered I/O.
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
    length: u64,
    path: PathBuf,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Res<BoxStream> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).at(ErrorKind::Io, &PathContext(&path))?;
        let length = file
            .seek(SeekFrom::End(0))
            .at(ErrorKind::Io, &PathContext(&path))?;
        file.seek(SeekFrom::Start(0))
            .at(ErrorKind::Io, &PathContext(&path))?;
        Ok(Box::new(FileStream {
            file: Some(file),
            length,
            path,
        }))
    }
}

/// Borrowed helper so `open()` can describe errors before a `FileStream`
/// exists to borrow from.
struct PathContext<'a>(&'a Path);

impl ErrorContext for PathContext<'_> {
    fn describe(&self) -> Option<String> {
        Some(self.0.display().to_string())
    }
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Res<usize> {
        let path = self.path.clone();
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let n = file.read(buf).at(ErrorKind::Io, &PathContext(&path))?;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> Res<()> {
        check_off(pos, self.length)?;
        let path = self.path.clone();
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.seek(SeekFrom::Start(pos))
            .at(ErrorKind::Io, &PathContext(&path))?;
        Ok(())
    }

    fn duplicate(&self) -> Res<BoxStream> {
        FileStream::open(&self.path)
    }

    fn close(&mut self) {
        self.file = None;
    }
}
