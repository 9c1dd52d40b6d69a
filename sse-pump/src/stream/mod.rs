// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Streaming response decoder
//
// Responsibilities:
// - Recover frame boundaries from arbitrarily chunked transport bytes
// - Decode UTF-8 without corrupting characters split across chunks
// - Assemble SSE fields (or JSON lines) into records, skipping keep-alives
// - Expose the result as a lazily pulled, cancellable stream
// - Produce identical records however the transport fragments the body

mod accumulator;
mod error;
mod frame;
mod policy;
mod pump;
mod transport;
mod types;
mod utf8;

pub use accumulator::ByteAccumulator;
pub use error::{FrameParseError, PumpError, TransportError};
pub use frame::MessageFrameDecoder;
pub use policy::{Disposition, EventPolicy};
pub use pump::StreamPump;
pub use transport::{ChunkIter, TransportBody};
pub use types::{Delimiter, Dispatch, FramingMode, MessageRecord, PayloadFormat, PumpState};
pub use utf8::Utf8IncrementalDecoder;

#[cfg(test)]
mod tests;
