// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Byte accumulator
//
// Owns the bytes received but not yet classified into a complete frame.
// Frames are split off the front of the buffer without copying; the
// scan offset remembers how far a previous search already looked so a
// long unterminated frame is not rescanned from the start on every chunk.

use bytes::{Buf, Bytes, BytesMut};

use super::types::Delimiter;

/// Growable byte buffer with delimiter-based frame extraction.
#[derive(Debug)]
pub struct ByteAccumulator {
    buffer: BytesMut,
    delimiter: Delimiter,
    /// No delimiter starts before this offset into `buffer`.
    scanned: usize,
}

impl ByteAccumulator {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            buffer: BytesMut::new(),
            delimiter,
            scanned: 0,
        }
    }

    /// Append a transport chunk. Never blocks and enforces no bound.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes held that have not been returned as a frame yet.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Split off the next complete frame, delimiter excluded.
    ///
    /// `None` means the delimiter has not arrived yet. An empty frame
    /// (`Some` of zero bytes) is a blank line and is a different thing.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let (end, delimiter_len) = self.find_delimiter()?;
        let frame = self.buffer.split_to(end).freeze();
        self.buffer.advance(delimiter_len);
        self.scanned = 0;
        Some(frame)
    }

    /// Hand back whatever is left at end of stream. May be empty.
    ///
    /// With `LineBreak` a trailing `\r` could only have been a
    /// terminator, so it is stripped.
    pub fn drain_remainder(&mut self) -> Bytes {
        let mut rest = self.buffer.split().freeze();
        self.scanned = 0;
        if self.delimiter == Delimiter::LineBreak && rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        rest
    }

    /// Returns the frame end and the length of the delimiter found there.
    fn find_delimiter(&mut self) -> Option<(usize, usize)> {
        match &self.delimiter {
            Delimiter::LineBreak => {
                let start = self.scanned;
                let Some(offset) = self.buffer[start..]
                    .iter()
                    .position(|b| *b == b'\n' || *b == b'\r')
                else {
                    self.scanned = self.buffer.len();
                    return None;
                };
                let pos = start + offset;
                if self.buffer[pos] == b'\n' {
                    return Some((pos, 1));
                }
                match self.buffer.get(pos + 1) {
                    Some(b'\n') => Some((pos, 2)),
                    Some(_) => Some((pos, 1)),
                    // A `\r` at the very end may still be the first half of `\r\n`.
                    None => {
                        self.scanned = pos;
                        None
                    }
                }
            }
            Delimiter::Literal(needle) => {
                let start = self.scanned;
                match find_subslice(&self.buffer[start..], needle) {
                    Some(offset) => Some((start + offset, needle.len())),
                    None => {
                        // The tail may hold the first bytes of a split delimiter.
                        self.scanned = self
                            .buffer
                            .len()
                            .saturating_sub(needle.len().saturating_sub(1));
                        None
                    }
                }
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [] => None,
        [byte] => haystack.iter().position(|b| b == byte),
        _ => haystack
            .windows(needle.len())
            .position(|window| window == needle),
    }
}
