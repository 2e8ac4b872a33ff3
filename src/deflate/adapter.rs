//! Wraps a [`Decoder`] as a [`Stream`][crate::stream::Stream]: a DEFLATE
//! byte source reads like any other, but cannot be seeked or duplicated.

use crate::error::{ErrorBuilder, ErrorKind, Res};
use crate::stream::{take, BoxStream, Stream};

use super::decoder::Decoder;

/// A DEFLATE-compressed stream, decoded on the fly as it is read.
#[derive(Debug)]
pub struct DeflateStream {
    decoder: Decoder,
}

impl DeflateStream {
    /// Wrap `source` (taking ownership, leaving a null stream behind) as a
    /// decompressing stream.
    pub fn wrap(source: &mut BoxStream) -> BoxStream {
        let source = take(source);
        Box::new(DeflateStream {
            decoder: Decoder::new(source),
        })
    }
}

impl Stream for DeflateStream {
    fn read(&mut self, buf: &mut [u8]) -> Res<usize> {
        self.decoder.read(buf)
    }

    fn seek(&mut self, _pos: u64) -> Res<()> {
        Err(ErrorBuilder::msg(ErrorKind::NotSeekable, "the stream is not seekable").into())
    }

    fn duplicate(&self) -> Res<BoxStream> {
        Err(ErrorBuilder::msg(ErrorKind::NotDuplicable, "the stream cannot be duplicated").into())
    }

    fn close(&mut self) {
        self.decoder.close();
    }
}
