//! Sequential local-file-header walker. The ZIP central directory is never
//! consulted; entries are discovered by reading headers back to back from
//! offset 0, exactly as they were written.

use crate::error::{ErrorBuilder, ErrorKind, Res};
use crate::stream::BoxStream;

const HEADER_LEN: u64 = 30;
const SIGNATURE: [u8; 4] = *b"PK\x03\x04";

/// One parsed local-file-header chunk.
#[derive(Debug, Clone)]
pub(crate) struct EntryMeta {
    pub name: Vec<u8>,
    pub uncompressed_size: u32,
    pub compression_method: u16,
    pub data_offset: u64,
    pub compressed_size: u32,
    /// Not verified by the walker itself; see the `crc32` feature on
    /// `EntryHandle`.
    pub crc32: u32,
}

fn read_exact(stream: &mut BoxStream, buf: &mut [u8]) -> Res<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = stream.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

fn u16_le(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Read and parse the header at `off`, or `Ok(None)` if the walk has ended
/// (short read or bad signature, not an error).
fn read_header(stream: &mut BoxStream, off: u64) -> Res<Option<EntryMeta>> {
    stream.seek(off)?;
    let mut header = [0u8; HEADER_LEN as usize];
    if read_exact(stream, &mut header)? != header.len() {
        log::debug!("chunk at {off}: short header read, stopping walk");
        return Ok(None);
    }
    if header[0..4] != SIGNATURE {
        log::debug!("chunk at {off}: signature mismatch, stopping walk");
        return Ok(None);
    }

    let compression_method = u16_le(&header[8..10]);
    let crc32 = u32_le(&header[14..18]);
    let compressed_size = u32_le(&header[18..22]);
    let uncompressed_size = u32_le(&header[22..26]);
    let fname_len = u16_le(&header[26..28]) as u64;
    let extra_len = u16_le(&header[28..30]) as u64;

    let mut name = vec![0u8; fname_len as usize];
    if read_exact(stream, &mut name)? != name.len() {
        return Ok(None);
    }

    let data_offset = off + HEADER_LEN + fname_len + extra_len;
    log::debug!(
        "chunk at {off}: name {} bytes, method {compression_method}, data at {data_offset}, {compressed_size} bytes compressed",
        name.len()
    );

    Ok(Some(EntryMeta {
        name,
        uncompressed_size,
        compression_method,
        data_offset,
        compressed_size,
        crc32,
    }))
}

fn advance(meta: &EntryMeta, off: u64, extra_len_consumed: u64) -> u64 {
    off + HEADER_LEN + extra_len_consumed + meta.compressed_size as u64
}

/// Walk every local-file-header chunk from offset 0, calling `visit` with
/// each one. `visit` returns `true` to keep walking, `false` to stop early.
pub(crate) fn walk(
    stream: &mut BoxStream,
    mut visit: impl FnMut(&EntryMeta) -> bool,
) -> Res<()> {
    let mut off = 0u64;
    loop {
        let Some(meta) = read_header(stream, off)? else {
            return Ok(());
        };
        let fname_len = meta.name.len() as u64;
        let extra_len = meta.data_offset - off - HEADER_LEN - fname_len;
        let keep_going = visit(&meta);
        off = advance(&meta, off, fname_len + extra_len);
        if !keep_going {
            return Ok(());
        }
    }
}

/// Walk until `pred` matches, returning the first matching entry.
pub(crate) fn find(
    stream: &mut BoxStream,
    mut pred: impl FnMut(&EntryMeta) -> bool,
) -> Res<Option<EntryMeta>> {
    let mut found = None;
    walk(stream, |meta| {
        if pred(meta) {
            found = Some(meta.clone());
            false
        } else {
            true
        }
    })?;
    Ok(found)
}

pub(crate) fn unsupported_method(method: u16) -> Res<()> {
    if method == 0 || method == 8 {
        Ok(())
    } else {
        Err(ErrorBuilder::msg(
            ErrorKind::Unsupported,
            format!("unsupported compression method {method}"),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{SliceStream, Stream};

    #[derive(Debug)]
    struct MemStream {
        data: Vec<u8>,
        pos: usize,
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> Res<usize> {
            let n = (self.data.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
        fn seek(&mut self, pos: u64) -> Res<()> {
            self.pos = pos as usize;
            Ok(())
        }
        fn duplicate(&self) -> Res<BoxStream> {
            Ok(Box::new(MemStream {
                data: self.data.clone(),
                pos: 0,
            }))
        }
        fn close(&mut self) {}
    }

    fn local_header(name: &[u8], method: u16, payload: &[u8]) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&SIGNATURE);
        h.extend_from_slice(&0u16.to_le_bytes()); // version needed
        h.extend_from_slice(&0u16.to_le_bytes()); // flags
        h.extend_from_slice(&method.to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes()); // mod time
        h.extend_from_slice(&0u16.to_le_bytes()); // mod date
        h.extend_from_slice(&0u32.to_le_bytes()); // crc32
        h.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        h.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        h.extend_from_slice(&(name.len() as u16).to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes()); // extra len
        h.extend_from_slice(name);
        h.extend_from_slice(payload);
        h
    }

    #[test]
    fn empty_archive_yields_no_entries() {
        let mut stream: BoxStream = Box::new(MemStream {
            data: Vec::new(),
            pos: 0,
        });
        let mut count = 0;
        walk(&mut stream, |_| {
            count += 1;
            true
        })
        .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn walk_visits_two_entries_in_order() {
        let mut data = local_header(b"a.txt", 0, b"hello\n");
        data.extend(local_header(b"b.txt", 0, b"world\n"));
        let mut stream: BoxStream = Box::new(MemStream { data, pos: 0 });

        let mut names = Vec::new();
        walk(&mut stream, |meta| {
            names.push(meta.name.clone());
            true
        })
        .unwrap();
        assert_eq!(names, vec![b"a.txt".to_vec(), b"b.txt".to_vec()]);
    }

    #[test]
    fn find_returns_none_for_a_missing_name() {
        let data = local_header(b"a.txt", 0, b"hello\n");
        let mut stream: BoxStream = Box::new(MemStream { data, pos: 0 });
        let found = find(&mut stream, |meta| meta.name == b"missing").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn find_captures_the_matching_record_and_stops_early() {
        let mut data = local_header(b"a.txt", 0, b"hello\n");
        data.extend(local_header(b"b.txt", 0, b"world\n"));
        let mut stream: BoxStream = Box::new(MemStream { data, pos: 0 });
        let found = find(&mut stream, |meta| meta.name == b"b.txt")
            .unwrap()
            .unwrap();
        assert_eq!(found.name, b"b.txt");
        assert_eq!(found.uncompressed_size, 6);
    }

    #[test]
    fn data_offset_points_exactly_past_name_and_extra() {
        let data = local_header(b"a.txt", 0, b"hello\n");
        let mut stream: BoxStream = Box::new(MemStream { data, pos: 0 });
        let found = find(&mut stream, |_| true).unwrap().unwrap();
        assert_eq!(found.data_offset, HEADER_LEN + 5);
        let _ = SliceStream::open; // exercised end-to-end in lib.rs integration tests
    }
}
