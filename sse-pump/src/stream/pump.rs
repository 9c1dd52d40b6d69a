// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream pump
//
// Pull-based state machine tying the decoders together:
//   Idle -> Streaming -> Draining -> Done, with Failed reachable from any
//   non-terminal state.
//
// Nothing is read from the transport until the consumer polls for the
// next record, so backpressure is implicit and nothing is queued beyond
// the bytes of the frame in progress. Cancellation is checked on every
// poll and also wakes a poll that is parked on the transport.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::StreamExt as _;
use tokio_stream::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::config::DecoderConfig;

use super::accumulator::ByteAccumulator;
use super::error::{PumpError, TransportError};
use super::frame::MessageFrameDecoder;
use super::transport::TransportBody;
use super::types::{Dispatch, FramingMode, MessageRecord, PumpState};
use super::utf8::Utf8IncrementalDecoder;

/// Decodes one response stream into `MessageRecord`s.
///
/// Yields records in arrival order, then either ends or yields exactly
/// one `PumpError`. Not restartable: build a new pump per response.
pub struct StreamPump<S> {
    transport: Option<TransportBody<S>>,
    chunks: Option<S>,
    accumulator: ByteAccumulator,
    utf8: Utf8IncrementalDecoder,
    frames: MessageFrameDecoder,
    ready: VecDeque<MessageRecord>,
    error: Option<PumpError>,
    state: PumpState,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    framing: FramingMode,
    max_frame_bytes: Option<usize>,
}

impl<S, B> StreamPump<S>
where
    S: Stream<Item = Result<B, TransportError>> + Unpin,
    B: AsRef<[u8]>,
{
    pub fn new(body: TransportBody<S>, config: &DecoderConfig, cancel: CancellationToken) -> Self {
        Self {
            transport: Some(body),
            chunks: None,
            accumulator: ByteAccumulator::new(config.delimiter.clone()),
            utf8: Utf8IncrementalDecoder::new(),
            frames: MessageFrameDecoder::new(config),
            ready: VecDeque::new(),
            error: None,
            state: PumpState::Idle,
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
            cancel,
            framing: config.framing,
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Most recent SSE `id:` seen, for callers that reconnect.
    pub fn last_event_id(&self) -> Option<&str> {
        self.frames.last_event_id()
    }

    /// Most recent SSE `retry:` value in milliseconds.
    pub fn retry(&self) -> Option<u64> {
        self.frames.retry()
    }

    fn transition(&mut self, next: PumpState) {
        tracing::debug!(from = ?self.state, to = ?next, "stream pump state change");
        self.state = next;
        if next.is_terminal() {
            self.release();
        }
    }

    /// Drop the transport and every buffer owned by the session.
    fn release(&mut self) {
        self.transport = None;
        self.chunks = None;
        drop(self.accumulator.drain_remainder());
        drop(self.utf8.flush());
    }

    fn fail(&mut self, err: PumpError) {
        tracing::warn!(error = %err, "stream pump failed");
        self.error = Some(err);
        self.transition(PumpState::Failed);
    }

    fn cancel_now(&mut self) {
        tracing::debug!(
            buffered_bytes = self.accumulator.pending_len(),
            queued_records = self.ready.len(),
            "stream pump cancelled, discarding in-flight data"
        );
        self.ready.clear();
        self.transition(PumpState::Done);
    }

    /// `Idle -> Streaming`, or `Failed` when there is nothing to stream.
    fn start(&mut self) -> Result<(), PumpError> {
        let Some(body) = self.transport.take() else {
            return Err(TransportError::NoBody.into());
        };
        let (chunks, unsupported_runtime) = body.into_parts();
        if let Some(runtime) = unsupported_runtime {
            return Err(PumpError::EnvironmentUnsupported { runtime });
        }
        let Some(chunks) = chunks else {
            return Err(TransportError::NoBody.into());
        };
        tracing::debug!(framing = ?self.framing, "stream pump started");
        self.chunks = Some(chunks);
        self.transition(PumpState::Streaming);
        Ok(())
    }

    fn process_frame(&mut self, frame: &[u8]) -> Result<(), PumpError> {
        // Delimiters are valid UTF-8, so a sequence still open at the end of
        // a frame is truncated and becomes U+FFFD within this line.
        let mut text = self.utf8.decode(frame);
        text.push_str(&self.utf8.flush());
        let dispatch = self.frames.feed(&text)?;
        self.apply(dispatch)
    }

    /// Flush residue in order: unterminated bytes, held-back UTF-8, then
    /// the pending record.
    fn drain(&mut self) -> Result<(), PumpError> {
        let rest = self.accumulator.drain_remainder();
        let mut text = self.utf8.decode(&rest);
        text.push_str(&self.utf8.flush());
        if !text.is_empty() {
            let dispatch = self.frames.feed(&text)?;
            self.apply(dispatch)?;
        }
        if self.state == PumpState::Draining {
            let dispatch = self.frames.finish()?;
            self.apply(dispatch)?;
        }
        if self.state == PumpState::Draining {
            self.transition(PumpState::Done);
        }
        Ok(())
    }

    fn apply(&mut self, dispatch: Option<Dispatch>) -> Result<(), PumpError> {
        match dispatch {
            None => Ok(()),
            Some(Dispatch::Record(record)) => {
                self.ready.push_back(record);
                Ok(())
            }
            Some(Dispatch::Done) => {
                tracing::debug!("done sentinel received");
                self.transition(PumpState::Done);
                Ok(())
            }
            Some(Dispatch::RemoteError(record)) => Err(PumpError::Remote {
                event: record.event_name().to_string(),
                data: record.data,
                payload: record.payload,
            }),
        }
    }

    fn check_frame_limit(&self) -> Result<(), PumpError> {
        match self.max_frame_bytes {
            Some(limit) if self.accumulator.pending_len() > limit => {
                Err(PumpError::FrameTooLarge {
                    limit,
                    buffered: self.accumulator.pending_len(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl<S, B> Stream for StreamPump<S>
where
    S: Stream<Item = Result<B, TransportError>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<MessageRecord, PumpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if !this.state.is_terminal() && this.cancel.is_cancelled() {
                this.cancel_now();
                return Poll::Ready(None);
            }

            if let Some(record) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }

            match this.state {
                PumpState::Done => return Poll::Ready(None),
                PumpState::Failed => return Poll::Ready(this.error.take().map(Err)),
                PumpState::Idle => {
                    if let Err(err) = this.start() {
                        this.fail(err);
                    }
                }
                PumpState::Streaming => {
                    if let Some(frame) = this.accumulator.next_frame() {
                        if let Err(err) = this.process_frame(&frame) {
                            this.fail(err);
                        }
                        continue;
                    }
                    if let Err(err) = this.check_frame_limit() {
                        this.fail(err);
                        continue;
                    }

                    let Some(chunks) = this.chunks.as_mut() else {
                        this.transition(PumpState::Draining);
                        continue;
                    };
                    let next = match chunks.poll_next_unpin(cx) {
                        Poll::Ready(next) => next,
                        Poll::Pending => {
                            // Park on the token too, so cancelling wakes us.
                            ready!(this.cancelled.as_mut().poll(cx));
                            continue;
                        }
                    };
                    match next {
                        Some(Ok(chunk)) => this.accumulator.append(chunk.as_ref()),
                        Some(Err(err)) => this.fail(err.into()),
                        None => {
                            this.chunks = None;
                            this.transition(PumpState::Draining);
                        }
                    }
                }
                PumpState::Draining => {
                    if let Err(err) = this.drain() {
                        this.fail(err);
                    }
                }
            }
        }
    }
}
