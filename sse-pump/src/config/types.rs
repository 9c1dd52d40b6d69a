// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use crate::stream::{Delimiter, FramingMode, PayloadFormat};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Parsed and validated config document.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wire conventions handed to each decode session.
    pub decoder: DecoderConfig,
    /// SHA256 of the raw YAML: "sha256:{hex}".
    pub fingerprint: String,
}

// ---------------------------------------------------------------------------
// Decoder conventions
// ---------------------------------------------------------------------------

/// Wire conventions for one deployment. Fixed per session, never
/// negotiated with the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// How lines group into records.
    pub framing: FramingMode,
    /// Frame terminator on the wire.
    pub delimiter: Delimiter,
    /// Lines starting with this are keep-alives.
    pub comment_prefix: String,
    /// Field carrying the record payload.
    pub payload_field: String,
    /// Declared representation of the payload field.
    pub payload_format: PayloadFormat,
    /// Additional field names captured into `MessageRecord::extra`.
    pub extra_fields: Vec<String>,
    /// Event names dropped without parsing.
    pub ignored_events: Vec<String>,
    /// Event name surfaced as a terminal remote error.
    pub error_event: Option<String>,
    /// Payload text that ends the stream.
    pub done_sentinel: Option<String>,
    /// Upper bound on bytes buffered without a delimiter. `None` = unbounded.
    pub max_frame_bytes: Option<usize>,
}
