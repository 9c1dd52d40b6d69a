// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

/// Failures reported by the transport that feeds the pump.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport returned no response body")]
    NoBody,

    #[error("transport read failed: {0}")]
    Read(String),
}

/// A completed record whose payload could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum FrameParseError {
    #[error("payload of '{event}' record is not valid JSON: {source}")]
    InvalidJson {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Terminal errors yielded by the stream pump.
///
/// At most one is ever yielded, always as the last item of the stream.
#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("runtime '{runtime}' does not support streaming response bodies")]
    EnvironmentUnsupported { runtime: String },

    #[error(transparent)]
    FrameParse(#[from] FrameParseError),

    #[error("stream sent an '{event}' event: {data}")]
    Remote {
        event: String,
        data: String,
        payload: Option<serde_json::Value>,
    },

    #[error("unterminated frame of {buffered} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { limit: usize, buffered: usize },
}
