// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Transport boundary
//
// The host's HTTP layer adapts whatever body type it has into a stream
// of byte chunks and wraps it here, together with what it knows about
// the runtime. Connection setup, TLS and auth stay on the host side.

use super::error::TransportError;

/// In-memory chunk source, mostly for tests and replays.
pub type ChunkIter<B> = tokio_stream::Iter<std::vec::IntoIter<Result<B, TransportError>>>;

/// Response body as handed over by the transport.
#[derive(Debug)]
pub struct TransportBody<S> {
    chunks: Option<S>,
    unsupported_runtime: Option<String>,
}

impl<S> TransportBody<S> {
    /// A streaming body.
    pub fn streaming(chunks: S) -> Self {
        Self {
            chunks: Some(chunks),
            unsupported_runtime: None,
        }
    }

    /// The response carried no body at all.
    pub fn empty() -> Self {
        Self {
            chunks: None,
            unsupported_runtime: None,
        }
    }

    /// The host detected a runtime that cannot stream response bodies.
    /// The pump refuses it rather than buffering the whole response.
    pub fn unsupported(runtime: impl Into<String>) -> Self {
        Self {
            chunks: None,
            unsupported_runtime: Some(runtime.into()),
        }
    }

    pub(crate) fn into_parts(self) -> (Option<S>, Option<String>) {
        (self.chunks, self.unsupported_runtime)
    }
}

impl<B> TransportBody<ChunkIter<B>> {
    /// Streaming body over chunks already in memory.
    pub fn from_chunks(chunks: impl IntoIterator<Item = B>) -> Self {
        let chunks: Vec<Result<B, TransportError>> = chunks.into_iter().map(Ok).collect();
        Self::streaming(tokio_stream::iter(chunks))
    }
}
