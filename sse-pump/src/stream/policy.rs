// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Event policy
//
// Decides what happens to a completed record before its payload is
// parsed: emit it, drop it (keep-alive events), end the stream (done
// sentinel), or surface it as a remote error.

use crate::config::DecoderConfig;

use super::types::MessageRecord;

/// Outcome of classifying a completed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Parse the payload and yield the record.
    Emit,
    /// Drop without parsing, e.g. `event: ping`.
    Ignore,
    /// Payload equals the done sentinel; stop the stream.
    Done,
    /// Event name matches the configured error event.
    RemoteError,
}

/// Per-deployment event conventions, fixed for the session.
#[derive(Debug, Clone, Default)]
pub struct EventPolicy {
    ignored_events: Vec<String>,
    error_event: Option<String>,
    done_sentinel: Option<String>,
}

impl EventPolicy {
    pub fn new(
        ignored_events: Vec<String>,
        error_event: Option<String>,
        done_sentinel: Option<String>,
    ) -> Self {
        Self {
            ignored_events,
            error_event,
            done_sentinel,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(
            config.ignored_events.clone(),
            config.error_event.clone(),
            config.done_sentinel.clone(),
        )
    }

    /// Classify a record. The sentinel check comes first because its
    /// payload is usually not valid in the declared format.
    pub fn classify(&self, record: &MessageRecord) -> Disposition {
        if let Some(sentinel) = &self.done_sentinel {
            if record.data.trim() == sentinel {
                return Disposition::Done;
            }
        }

        let Some(event) = record.event.as_deref() else {
            return Disposition::Emit;
        };

        if self.ignored_events.iter().any(|e| e == event) {
            return Disposition::Ignore;
        }
        if self.error_event.as_deref() == Some(event) {
            return Disposition::RemoteError;
        }
        Disposition::Emit
    }
}
