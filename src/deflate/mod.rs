//! A from-scratch RFC 1951 (DEFLATE) decompressor: bit reader, canonical
//! Huffman tables, the block state machine, and a [`Stream`][crate::stream::Stream]
//! adapter over it.

mod adapter;
mod bits;
mod decoder;
mod huffman;
mod tables;

pub use adapter::DeflateStream;
