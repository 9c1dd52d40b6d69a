// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Stream pump scenario tests
//
// Tests cover:
//  1. Records are identical however the body is chunked
//  2. Multibyte characters split across chunks survive; truncated ones
//     become U+FFFD inside their own line
//  3. A trailing record without a blank line is flushed once
//  4. A missing body fails on the first poll
//  5. An unsupported runtime fails on the first poll
//  6. Keep-alive comments are transparent
//  7. Cancellation stops emission, even with records buffered
//  8. A malformed payload ends the stream after earlier records
//  9. Event policy: ping, error events, done sentinel
// 10. Pull-based consumption of the transport

use super::*;
use crate::config::DecoderConfig;
use bytes::Bytes;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pump_over(chunks: Vec<Vec<u8>>, config: &DecoderConfig) -> StreamPump<ChunkIter<Vec<u8>>> {
    StreamPump::new(
        TransportBody::from_chunks(chunks),
        config,
        CancellationToken::new(),
    )
}

/// Drain a pump, checking that at most one error arrives and that it is last.
async fn collect<S, B>(mut pump: StreamPump<S>) -> (Vec<MessageRecord>, Option<PumpError>)
where
    S: tokio_stream::Stream<Item = Result<B, TransportError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut records = Vec::new();
    let mut error = None;
    while let Some(item) = pump.next().await {
        assert!(error.is_none(), "item yielded after the terminal error");
        match item {
            Ok(record) => records.push(record),
            Err(e) => error = Some(e),
        }
    }
    assert!(pump.state().is_terminal());
    (records, error)
}

async fn decode(chunks: Vec<Vec<u8>>, config: &DecoderConfig) -> Vec<MessageRecord> {
    let (records, error) = collect(pump_over(chunks, config)).await;
    assert!(error.is_none(), "unexpected error: {error:?}");
    records
}

fn chunked(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks.retain(|c| !c.is_empty());
    chunks
}

fn channel_stream() -> (
    mpsc::Sender<Result<Bytes, TransportError>>,
    ReceiverStream<Result<Bytes, TransportError>>,
) {
    let (tx, rx) = mpsc::channel(16);
    (tx, ReceiverStream::new(rx))
}

fn payload_field_config(field: &str) -> DecoderConfig {
    let mut config = DecoderConfig::default();
    config.payload_field = field.to_string();
    config
}

/// CRLF, lone CR, comments, multi-line data, a control record, multibyte
/// text and an unterminated final record, all in one body.
const MIXED_BODY: &[u8] = b"event: message_start\r\n\
data: {\"text\":\"h\xC3\xA9llo \xE2\x82\xAC \xF0\x9F\xA6\x80\"}\r\n\r\n\
: keep-alive\n\n\
id: 7\ndata: {\"n\":\r\ndata: 2}\r\r\
retry: 250\n\n\
data: {\"tail\":true}";

// ---------------------------------------------------------------------------
// Test 1: chunk-boundary invariance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mixed_body_decodes_to_expected_records() {
    let records = decode(vec![MIXED_BODY.to_vec()], &DecoderConfig::default()).await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].event.as_deref(), Some("message_start"));
    assert_eq!(records[0].payload, Some(json!({"text": "héllo € 🦀"})));
    assert_eq!(records[1].id.as_deref(), Some("7"));
    assert_eq!(records[1].data, "{\"n\":\n2}");
    assert_eq!(records[1].payload, Some(json!({"n": 2})));
    assert_eq!(records[2].payload, Some(json!({"tail": true})));
}

#[tokio::test]
async fn every_two_and_three_way_split_matches_single_chunk() {
    let config = DecoderConfig::default();
    let expected = decode(vec![MIXED_BODY.to_vec()], &config).await;
    let len = MIXED_BODY.len();

    for a in 1..len {
        let records = decode(chunked(MIXED_BODY, &[a]), &config).await;
        assert_eq!(records, expected, "split at {a}");
    }

    for a in 1..len {
        for b in (a + 1)..len {
            let records = decode(chunked(MIXED_BODY, &[a, b]), &config).await;
            assert_eq!(records, expected, "split at {a} and {b}");
        }
    }
}

#[tokio::test]
async fn byte_at_a_time_matches_single_chunk() {
    let config = DecoderConfig::default();
    let expected = decode(vec![MIXED_BODY.to_vec()], &config).await;
    let bytes: Vec<Vec<u8>> = MIXED_BODY.iter().map(|b| vec![*b]).collect();
    assert_eq!(decode(bytes, &config).await, expected);
}

#[tokio::test]
async fn literal_delimiter_split_mid_sequence() {
    let mut config = DecoderConfig::default();
    config.framing = FramingMode::JsonLines;
    config.delimiter = Delimiter::Literal(b"\r\n".to_vec());
    let body = b"{\"a\":1}\r\n{\"b\":2}\r\n";

    let expected = decode(vec![body.to_vec()], &config).await;
    assert_eq!(expected.len(), 2);
    for a in 1..body.len() {
        assert_eq!(decode(chunked(body, &[a]), &config).await, expected, "split at {a}");
    }
}

// ---------------------------------------------------------------------------
// Test 2: UTF-8 boundary safety
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multibyte_characters_split_at_every_offset() {
    for text in ["€", "🦀", "é"] {
        let body = format!("data: {{\"t\":\"{text}\"}}\n\n").into_bytes();
        let start = body.iter().position(|b| *b >= 0x80).unwrap();
        for cut in start..=start + text.len() {
            let records = decode(chunked(&body, &[cut]), &DecoderConfig::default()).await;
            assert_eq!(records.len(), 1, "{text} cut at {cut}");
            assert_eq!(records[0].payload, Some(json!({"t": text})), "{text} cut at {cut}");
        }
    }
}

#[tokio::test]
async fn truncated_character_at_line_end_stays_in_its_record() {
    let mut config = DecoderConfig::default();
    config.payload_format = PayloadFormat::Text;
    let body = b"data: caf\xC3\n\ndata: b\n\n";

    for cut in 1..body.len() {
        let records = decode(chunked(body, &[cut]), &config).await;
        let data: Vec<&str> = records.iter().map(|r| r.data.as_str()).collect();
        assert_eq!(data, vec!["caf\u{FFFD}", "b"], "split at {cut}");
    }
}

#[tokio::test]
async fn truncated_character_before_delimiter_does_not_hide_next_record() {
    let body = b"data: {\"a\":1}\xE2\n\ndata: {\"b\":2}\n\n".to_vec();
    let (records, error) = collect(pump_over(vec![body], &DecoderConfig::default())).await;

    // The replacement character makes the first payload invalid JSON.
    assert!(records.is_empty());
    assert!(matches!(error, Some(PumpError::FrameParse(_))));
}

#[tokio::test]
async fn literal_delimiter_keeps_carriage_return_in_payload() {
    let mut config = DecoderConfig::default();
    config.delimiter = Delimiter::Literal(b"<END>".to_vec());
    config.payload_format = PayloadFormat::Text;
    let body = b"data: a\r<END><END>data: b<END><END>";

    for cut in 1..body.len() {
        let records = decode(chunked(body, &[cut]), &config).await;
        let data: Vec<&str> = records.iter().map(|r| r.data.as_str()).collect();
        assert_eq!(data, vec!["a\r", "b"], "split at {cut}");
    }
}

#[tokio::test]
async fn truncated_character_at_stream_end_becomes_replacement() {
    let mut config = DecoderConfig::default();
    config.payload_format = PayloadFormat::Text;
    let records = decode(vec![b"data: caf\xC3".to_vec()], &config).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, "caf\u{FFFD}");
}

// ---------------------------------------------------------------------------
// Test 3: trailing partial record flush
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trailing_record_without_blank_line_flushed_once() {
    let config = payload_field_config("field");
    let pump = pump_over(vec![b"field: {\"a\":1}".to_vec()], &config);
    let (records, error) = collect(pump).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload, Some(json!({"a": 1})));
}

#[tokio::test]
async fn stream_ending_on_delimiter_has_no_extra_record() {
    let records = decode(
        vec![b"data: {\"a\":1}\n\n".to_vec()],
        &DecoderConfig::default(),
    )
    .await;
    assert_eq!(records.len(), 1);
}

// ---------------------------------------------------------------------------
// Test 4 / 5: rejected before any bytes are consumed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_body_fails_on_first_poll() {
    let mut pump = StreamPump::new(
        TransportBody::<ChunkIter<Bytes>>::empty(),
        &DecoderConfig::default(),
        CancellationToken::new(),
    );

    let first = pump.next().await.expect("an item on first poll");
    assert!(matches!(first, Err(PumpError::Transport(TransportError::NoBody))));
    assert_eq!(pump.state(), PumpState::Failed);
    assert!(pump.next().await.is_none());
}

#[tokio::test]
async fn unsupported_runtime_fails_on_first_poll() {
    let mut pump = StreamPump::new(
        TransportBody::<ChunkIter<Bytes>>::unsupported("react-native"),
        &DecoderConfig::default(),
        CancellationToken::new(),
    );

    match pump.next().await {
        Some(Err(PumpError::EnvironmentUnsupported { runtime })) => {
            assert_eq!(runtime, "react-native")
        }
        other => panic!("expected EnvironmentUnsupported, got {other:?}"),
    }
    assert_eq!(pump.state(), PumpState::Failed);
    assert!(pump.next().await.is_none());
}

// ---------------------------------------------------------------------------
// Test 6: comment-line transparency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn keep_alive_comment_between_records_is_invisible() {
    let config = payload_field_config("field");
    let body = b"field: {\"a\":1}\n\n:keep-alive\n\nfield: {\"b\":2}\n\n".to_vec();

    let records = decode(vec![body], &config).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].payload, Some(json!({"a": 1})));
    assert_eq!(records[1].payload, Some(json!({"b": 2})));
    assert!(records.iter().all(|r| r.event.is_none() && r.extra.is_empty()));
}

// ---------------------------------------------------------------------------
// Test 7: cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_discards_buffered_records() {
    let (tx, input) = channel_stream();
    let cancel = CancellationToken::new();
    let mut pump = StreamPump::new(
        TransportBody::streaming(input),
        &DecoderConfig::default(),
        cancel.clone(),
    );

    // Both records arrive in a single chunk.
    tx.send(Ok(Bytes::from("data: {\"a\":1}\n\ndata: {\"b\":2}\n\n")))
        .await
        .unwrap();

    let first = pump.next().await.unwrap().unwrap();
    assert_eq!(first.payload, Some(json!({"a": 1})));

    cancel.cancel();
    tx.send(Ok(Bytes::from("data: {\"c\":3}\n\n"))).await.unwrap();

    assert!(pump.next().await.is_none());
    assert_eq!(pump.state(), PumpState::Done);
    assert!(pump.next().await.is_none());
}

#[tokio::test]
async fn cancellation_wakes_pump_waiting_on_transport() {
    let (tx, input) = channel_stream();
    let cancel = CancellationToken::new();
    let mut pump = StreamPump::new(
        TransportBody::streaming(input),
        &DecoderConfig::default(),
        cancel.clone(),
    );

    let waiter = tokio::spawn(async move {
        let item = pump.next().await;
        (item.is_none(), pump.state())
    });

    tokio::task::yield_now().await;
    cancel.cancel();

    let (ended, state) = waiter.await.unwrap();
    assert!(ended);
    assert_eq!(state, PumpState::Done);
    drop(tx);
}

#[tokio::test]
async fn cancelled_before_first_poll_yields_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let pump = StreamPump::new(
        TransportBody::from_chunks(vec![Bytes::from("data: 1\n\n")]),
        &DecoderConfig::default(),
        cancel,
    );
    let (records, error) = collect(pump).await;
    assert!(records.is_empty());
    assert!(error.is_none());
}

#[tokio::test]
async fn cancellation_after_completion_is_noop() {
    let cancel = CancellationToken::new();
    let mut pump = StreamPump::new(
        TransportBody::from_chunks(vec![Bytes::from("data: 1\n\n")]),
        &DecoderConfig::default(),
        cancel.clone(),
    );
    assert!(pump.next().await.unwrap().is_ok());
    assert!(pump.next().await.is_none());
    assert_eq!(pump.state(), PumpState::Done);

    cancel.cancel();
    assert!(pump.next().await.is_none());
    assert_eq!(pump.state(), PumpState::Done);
}

// ---------------------------------------------------------------------------
// Test 8: terminal errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_payload_terminates_after_prior_records() {
    let body = b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\nevent: delta\ndata: {oops\n\ndata: {\"c\":3}\n\n";
    let (records, error) = collect(pump_over(vec![body.to_vec()], &DecoderConfig::default())).await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].payload, Some(json!({"b": 2})));
    match error {
        Some(PumpError::FrameParse(FrameParseError::InvalidJson { event, .. })) => {
            assert_eq!(event, "delta")
        }
        other => panic!("expected FrameParse error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_trailing_record_surfaces_at_drain() {
    let body = b"data: {\"a\":1}\n\ndata: not-json".to_vec();
    let (records, error) = collect(pump_over(vec![body], &DecoderConfig::default())).await;
    assert_eq!(records.len(), 1);
    assert!(matches!(error, Some(PumpError::FrameParse(_))));
}

#[tokio::test]
async fn transport_read_error_after_records() {
    let (tx, input) = channel_stream();
    let pump = StreamPump::new(
        TransportBody::streaming(input),
        &DecoderConfig::default(),
        CancellationToken::new(),
    );

    tx.send(Ok(Bytes::from("data: {\"a\":1}\n\n"))).await.unwrap();
    tx.send(Err(TransportError::Read("connection reset".into())))
        .await
        .unwrap();
    drop(tx);

    let (records, error) = collect(pump).await;
    assert_eq!(records.len(), 1);
    assert!(matches!(
        error,
        Some(PumpError::Transport(TransportError::Read(ref msg))) if msg == "connection reset"
    ));
}

#[tokio::test]
async fn unterminated_frame_over_limit_fails() {
    let mut config = DecoderConfig::default();
    config.max_frame_bytes = Some(16);
    let chunks = vec![
        b"data: 1\n\n".to_vec(),
        b"data: 0123456789".to_vec(),
        b"abcdef".to_vec(),
        b"\n\n".to_vec(),
    ];

    let (records, error) = collect(pump_over(chunks, &config)).await;

    assert_eq!(records.len(), 1);
    assert!(matches!(
        error,
        Some(PumpError::FrameTooLarge { limit: 16, buffered: 22 })
    ));
}

// ---------------------------------------------------------------------------
// Test 9: event policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_events_are_skipped() {
    let body = b"event: ping\ndata: {\"type\":\"ping\"}\n\nevent: content\ndata: {\"x\":1}\n\n";
    let records = decode(vec![body.to_vec()], &DecoderConfig::default()).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event.as_deref(), Some("content"));
}

#[tokio::test]
async fn error_event_surfaces_as_remote_error() {
    let body = b"data: {\"x\":1}\n\nevent: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\"}}\n\ndata: {\"x\":2}\n\n";
    let (records, error) = collect(pump_over(vec![body.to_vec()], &DecoderConfig::default())).await;

    assert_eq!(records.len(), 1);
    match error {
        Some(PumpError::Remote { event, payload, .. }) => {
            assert_eq!(event, "error");
            assert_eq!(payload.unwrap()["error"]["type"], "overloaded_error");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn done_sentinel_ends_stream_without_reading_further() {
    let consumed = Arc::new(AtomicUsize::new(0));
    let counter = consumed.clone();
    let chunks = vec![
        Ok::<_, TransportError>(Bytes::from("data: {\"x\":1}\n\n")),
        Ok(Bytes::from("data: [DONE]\n\n")),
        Ok(Bytes::from("data: {\"x\":2}\n\n")),
    ];
    let input = tokio_stream::iter(chunks).map(move |c| {
        counter.fetch_add(1, Ordering::SeqCst);
        c
    });
    let pump = StreamPump::new(
        TransportBody::streaming(input),
        &DecoderConfig::default(),
        CancellationToken::new(),
    );

    let (records, error) = collect(pump).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(consumed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn disabled_policy_passes_everything_through() {
    let mut config = DecoderConfig::default();
    config.ignored_events.clear();
    config.error_event = None;
    config.done_sentinel = None;
    config.payload_format = PayloadFormat::Text;
    let body = b"event: ping\ndata: p\n\nevent: error\ndata: e\n\ndata: [DONE]\n\n";

    let records = decode(vec![body.to_vec()], &config).await;

    let data: Vec<&str> = records.iter().map(|r| r.data.as_str()).collect();
    assert_eq!(data, vec!["p", "e", "[DONE]"]);
}

// ---------------------------------------------------------------------------
// Test 10: pull-based consumption
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_is_only_read_on_demand() {
    let consumed = Arc::new(AtomicUsize::new(0));
    let counter = consumed.clone();
    let chunks: Vec<Result<Bytes, TransportError>> = (0..5)
        .map(|i| Ok(Bytes::from(format!("data: {{\"i\":{i}}}\n\n"))))
        .collect();
    let input = tokio_stream::iter(chunks).map(move |c| {
        counter.fetch_add(1, Ordering::SeqCst);
        c
    });
    let mut pump = StreamPump::new(
        TransportBody::streaming(input),
        &DecoderConfig::default(),
        CancellationToken::new(),
    );

    assert_eq!(consumed.load(Ordering::SeqCst), 0);
    let first = pump.next().await.unwrap().unwrap();
    assert_eq!(first.payload, Some(json!({"i": 0})));
    assert_eq!(consumed.load(Ordering::SeqCst), 1);

    let second = pump.next().await.unwrap().unwrap();
    assert_eq!(second.payload, Some(json!({"i": 1})));
    assert_eq!(consumed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn records_yielded_in_arrival_order() {
    let body: String = (0..50)
        .map(|i| format!("id: {i}\ndata: {{\"i\":{i}}}\n\n"))
        .collect();
    let chunks = chunked(body.as_bytes(), &[7, 100, 101, 333, 512]);
    let pump = pump_over(chunks, &DecoderConfig::default());
    assert!(pump.last_event_id().is_none());

    let records = collect(pump).await.0;
    let order: Vec<i64> = records
        .iter()
        .map(|r| r.payload.as_ref().unwrap()["i"].as_i64().unwrap())
        .collect();
    assert_eq!(order, (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn last_event_id_and_retry_are_exposed() {
    let mut pump = pump_over(
        vec![b"retry: 3000\n\nid: evt-9\ndata: {}\n\n".to_vec()],
        &DecoderConfig::default(),
    );
    let record = pump.next().await.unwrap().unwrap();
    assert_eq!(record.id.as_deref(), Some("evt-9"));
    assert_eq!(pump.last_event_id(), Some("evt-9"));
    assert_eq!(pump.retry(), Some(3000));
}

#[tokio::test]
async fn json_lines_body_split_anywhere() {
    let mut config = DecoderConfig::default();
    config.framing = FramingMode::JsonLines;
    let body = b"{\"type\":\"a\"}\n\n{\"type\":\"\xE2\x82\xAC\"}\r\n{\"type\":\"c\"}";

    let expected = decode(vec![body.to_vec()], &config).await;
    assert_eq!(expected.len(), 3);
    assert_eq!(expected[1].payload, Some(json!({"type": "€"})));
    for a in 1..body.len() {
        assert_eq!(decode(chunked(body, &[a]), &config).await, expected, "split at {a}");
    }
}
