// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Incremental UTF-8 decoder
//
// Holds back a trailing incomplete multibyte sequence (at most 3 bytes)
// until more input completes it. Bytes that can never form a valid
// sequence become U+FFFD using the same maximal-subpart policy as
// `String::from_utf8_lossy`, so incremental and one-shot decoding agree.

/// Decodes byte frames into text without splitting scalar values.
#[derive(Debug, Default)]
pub struct Utf8IncrementalDecoder {
    pending: Vec<u8>,
}

impl Utf8IncrementalDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an incomplete sequence is being held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decode as much of `bytes` (after any held-back prefix) as possible.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        if bytes.is_empty() {
            return String::new();
        }

        let joined;
        let input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(valid) = std::str::from_utf8(valid) {
                        out.push_str(valid);
                    }
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[invalid..];
                        }
                        None => {
                            // Valid prefix cut short by the end of input.
                            self.pending.extend_from_slice(tail);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Force out held-back bytes at end of input and reset.
    ///
    /// Nothing can complete them anymore, so an incomplete sequence
    /// decodes to a single U+FFFD.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&tail).into_owned()
    }
}
