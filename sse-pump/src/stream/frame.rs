// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Message frame decoder
//
// Assembles decoded lines into records.
//
// SSE framing:
// - `name: value` fields accumulate into a pending record
// - a blank line terminates the record
// - comment lines (reserved prefix, `:` by default) are keep-alives and
//   never touch the pending record
// - a record without a payload field is a control record (`retry:` or
//   `id:` only) and is absorbed, not emitted
//
// JSON-lines framing: every non-blank line is a record of its own.

use std::collections::BTreeMap;

use crate::config::DecoderConfig;

use super::error::FrameParseError;
use super::policy::{Disposition, EventPolicy};
use super::types::{Dispatch, FramingMode, MessageRecord, PayloadFormat};

/// Fields collected since the last terminator.
#[derive(Debug, Default)]
struct PendingRecord {
    event: Option<String>,
    data: String,
    has_payload: bool,
    id: Option<String>,
    retry: Option<u64>,
    extra: BTreeMap<String, String>,
    /// Set once any recognized field has been seen.
    touched: bool,
}

impl PendingRecord {
    fn push_payload(&mut self, value: &str) {
        if self.has_payload {
            self.data.push('\n');
        }
        self.data.push_str(value);
        self.has_payload = true;
    }

    fn into_record(self) -> MessageRecord {
        MessageRecord {
            event: self.event,
            data: self.data,
            id: self.id,
            retry: self.retry,
            extra: self.extra,
            payload: None,
        }
    }
}

/// Line-oriented record assembler.
#[derive(Debug)]
pub struct MessageFrameDecoder {
    framing: FramingMode,
    strip_cr: bool,
    comment_prefix: String,
    payload_field: String,
    payload_format: PayloadFormat,
    extra_fields: Vec<String>,
    policy: EventPolicy,
    pending: PendingRecord,
    last_event_id: Option<String>,
    retry: Option<u64>,
}

impl MessageFrameDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            framing: config.framing,
            strip_cr: config.delimiter.is_line_based(),
            comment_prefix: config.comment_prefix.clone(),
            payload_field: config.payload_field.clone(),
            payload_format: config.payload_format,
            extra_fields: config.extra_fields.clone(),
            policy: EventPolicy::from_config(config),
            pending: PendingRecord::default(),
            last_event_id: None,
            retry: None,
        }
    }

    /// Most recent `id:` seen on the stream, kept across records.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Most recent valid `retry:` value in milliseconds.
    pub fn retry(&self) -> Option<u64> {
        self.retry
    }

    /// Feed one line, without its terminator.
    pub fn feed(&mut self, line: &str) -> Result<Option<Dispatch>, FrameParseError> {
        let line = if self.strip_cr {
            line.strip_suffix('\r').unwrap_or(line)
        } else {
            line
        };
        match self.framing {
            FramingMode::Sse => self.feed_sse(line),
            FramingMode::JsonLines => self.feed_json_line(line),
        }
    }

    /// End of stream. A pending record without its blank line is still
    /// emitted: transports may close right after the last payload.
    pub fn finish(&mut self) -> Result<Option<Dispatch>, FrameParseError> {
        match self.framing {
            FramingMode::Sse => self.complete_pending(),
            FramingMode::JsonLines => Ok(None),
        }
    }

    fn feed_sse(&mut self, line: &str) -> Result<Option<Dispatch>, FrameParseError> {
        if line.is_empty() {
            return self.complete_pending();
        }
        if line.starts_with(self.comment_prefix.as_str()) {
            tracing::trace!("keep-alive comment skipped");
            return Ok(None);
        }

        let (name, value) = split_field(line);
        if name == self.payload_field {
            self.pending.push_payload(value);
        } else {
            match name {
                "event" => self.pending.event = Some(value.to_string()),
                "id" => {
                    if value.contains('\0') {
                        return Ok(None);
                    }
                    self.pending.id = Some(value.to_string());
                    self.last_event_id = Some(value.to_string());
                }
                "retry" => {
                    let Some(ms) = parse_retry(value) else {
                        return Ok(None);
                    };
                    self.pending.retry = Some(ms);
                    self.retry = Some(ms);
                }
                other if self.extra_fields.iter().any(|f| f == other) => {
                    self.pending.extra.insert(other.to_string(), value.to_string());
                }
                other => {
                    tracing::trace!(field = other, "unrecognized field ignored");
                    return Ok(None);
                }
            }
        }
        self.pending.touched = true;
        Ok(None)
    }

    fn feed_json_line(&mut self, line: &str) -> Result<Option<Dispatch>, FrameParseError> {
        if line.trim().is_empty() || line.starts_with(self.comment_prefix.as_str()) {
            return Ok(None);
        }
        let record = MessageRecord {
            data: line.to_string(),
            ..Default::default()
        };
        self.dispatch(record)
    }

    fn complete_pending(&mut self) -> Result<Option<Dispatch>, FrameParseError> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.touched {
            return Ok(None);
        }
        if !pending.has_payload {
            tracing::debug!(
                event = pending.event.as_deref().unwrap_or(""),
                "control record without payload absorbed"
            );
            return Ok(None);
        }
        self.dispatch(pending.into_record())
    }

    fn dispatch(&self, mut record: MessageRecord) -> Result<Option<Dispatch>, FrameParseError> {
        match self.policy.classify(&record) {
            Disposition::Ignore => {
                tracing::trace!(event = record.event_name(), "ignored event skipped");
                Ok(None)
            }
            Disposition::Done => Ok(Some(Dispatch::Done)),
            Disposition::RemoteError => {
                record.payload = serde_json::from_str(&record.data).ok();
                Ok(Some(Dispatch::RemoteError(record)))
            }
            Disposition::Emit => {
                record.payload = self.parse_payload(&record)?;
                Ok(Some(Dispatch::Record(record)))
            }
        }
    }

    fn parse_payload(
        &self,
        record: &MessageRecord,
    ) -> Result<Option<serde_json::Value>, FrameParseError> {
        match self.payload_format {
            PayloadFormat::Text => Ok(None),
            PayloadFormat::Json => serde_json::from_str(&record.data)
                .map(Some)
                .map_err(|source| FrameParseError::InvalidJson {
                    event: record.event_name().to_string(),
                    source,
                }),
        }
    }
}

/// Split `name:value`, dropping one leading space from the value.
/// A line without a colon is a field name with an empty value.
fn split_field(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    }
}

fn parse_retry(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
