// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Framing conventions, the decoded record, and the pump lifecycle.

use std::collections::BTreeMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Framing conventions
// ---------------------------------------------------------------------------

/// Byte sequence that terminates one frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Any of `\n`, `\r\n` or a lone `\r`, the SSE line-terminator set.
    #[default]
    LineBreak,
    /// A fixed, non-empty byte sequence.
    Literal(Vec<u8>),
}

impl Delimiter {
    /// A single `\n`.
    pub fn lf() -> Self {
        Delimiter::Literal(b"\n".to_vec())
    }

    /// `\r\n` only.
    pub fn crlf() -> Self {
        Delimiter::Literal(b"\r\n".to_vec())
    }

    /// Line break delimiters, where a stray `\r` before the terminator is
    /// part of the line ending rather than the content.
    pub fn is_line_based(&self) -> bool {
        match self {
            Delimiter::LineBreak => true,
            Delimiter::Literal(bytes) => bytes == b"\n" || bytes == b"\r\n",
        }
    }
}

/// How lines are grouped into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    /// `name: value` fields terminated by a blank line.
    #[default]
    Sse,
    /// One record per non-blank line.
    JsonLines,
}

/// Declared representation of the payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// Parsed with serde_json; a parse failure terminates the stream.
    #[default]
    Json,
    /// Kept as raw text, `MessageRecord::payload` stays `None`.
    Text,
}

// ---------------------------------------------------------------------------
// Decoded record
// ---------------------------------------------------------------------------

/// A fully assembled record, ready for the caller to interpret.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageRecord {
    /// Value of the last `event:` field, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Raw payload text. Multiple payload lines are joined with `\n`.
    pub data: String,
    /// Value of the `id:` field carried by this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Reconnection delay in milliseconds, if the record carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
    /// Configured extra fields, last value wins.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    /// Parsed payload when the payload format is JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl MessageRecord {
    /// Event name with the SSE default of `message` applied.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// What the frame decoder hands to the pump when a record completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A record to yield to the caller.
    Record(MessageRecord),
    /// The server sent an error event; terminates the stream.
    RemoteError(MessageRecord),
    /// The done sentinel arrived; the stream ends cleanly.
    Done,
}

// ---------------------------------------------------------------------------
// Pump lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of one decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Nothing has been pulled yet.
    Idle,
    /// Pulling chunks from the transport.
    Streaming,
    /// Transport exhausted; residue is being flushed.
    Draining,
    /// Finished, cancelled or hit the done sentinel.
    Done,
    /// Terminated by an error.
    Failed,
}

impl PumpState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PumpState::Done | PumpState::Failed)
    }
}
