// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use crate::stream::{Delimiter, FramingMode, PayloadFormat};

use super::types::DecoderConfig;

/// Only contract version understood by the loader.
pub const CONTRACT_VERSION: &str = "v1";

pub const DEFAULT_COMMENT_PREFIX: &str = ":";

pub const DEFAULT_PAYLOAD_FIELD: &str = "data";

/// Keep-alive events sent by streaming LLM APIs.
pub const DEFAULT_IGNORED_EVENTS: &[&str] = &["ping"];

pub const DEFAULT_ERROR_EVENT: &str = "error";

pub const DEFAULT_DONE_SENTINEL: &str = "[DONE]";

/// Field names with fixed SSE meaning; the payload field may not reuse them.
pub const RESERVED_FIELDS: &[&str] = &["event", "id", "retry"];

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::Sse,
            delimiter: Delimiter::LineBreak,
            comment_prefix: DEFAULT_COMMENT_PREFIX.to_string(),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            payload_format: PayloadFormat::Json,
            extra_fields: Vec::new(),
            ignored_events: DEFAULT_IGNORED_EVENTS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            error_event: Some(DEFAULT_ERROR_EVENT.to_string()),
            done_sentinel: Some(DEFAULT_DONE_SENTINEL.to_string()),
            max_frame_bytes: None,
        }
    }
}
