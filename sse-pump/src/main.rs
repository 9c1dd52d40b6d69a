// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::Parser;
use sse_pump::config::{self, DecoderConfig};
use sse_pump::stream::{PumpError, StreamPump, TransportBody, TransportError};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sse-replay",
    about = "Decode a captured SSE or JSON-lines response body into JSON records"
)]
struct Cli {
    /// Captured response body; reads stdin when omitted
    input: Option<PathBuf>,

    /// Path to the decoder YAML; built-in defaults when omitted
    #[arg(long, env = "SSE_PUMP_CONFIG")]
    config: Option<PathBuf>,

    /// Exact bytes per transport chunk (the last one may be shorter)
    #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,
}

#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error(transparent)]
    Pump(#[from] PumpError),
    #[error("failed to write record: {0}")]
    Output(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let decoder = match cli.config {
        Some(path) => match config::load_config(&config::FileSource { path }) {
            Ok(c) => {
                tracing::info!(
                    framing = ?c.decoder.framing,
                    payload_field = %c.decoder.payload_field,
                    fingerprint = %c.fingerprint,
                    "config loaded"
                );
                c.decoder
            }
            Err(e) => {
                tracing::error!("failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("no config given, using built-in SSE conventions");
            DecoderConfig::default()
        }
    };

    let capture = match read_capture(cli.input.as_deref()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("failed to read input: {e}");
            std::process::exit(1);
        }
    };
    let chunk_size = usize::try_from(cli.chunk_size).unwrap_or(usize::MAX);
    let chunks = rechunk(&capture, chunk_size);
    tracing::info!(bytes = capture.len(), chunks = chunks.len(), "capture loaded");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling decode");
            on_interrupt.cancel();
        }
    });

    let pump = StreamPump::new(TransportBody::from_chunks(chunks), &decoder, cancel);
    match replay(pump).await {
        Ok(records) => tracing::info!(records, "replay finished"),
        Err(e) => {
            tracing::error!("replay failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Read the whole capture so it can be re-chunked at exact sizes; pipes
/// and stdin would otherwise hand back short reads.
async fn read_capture(input: Option<&std::path::Path>) -> std::io::Result<Vec<u8>> {
    match input {
        Some(path) => tokio::fs::read(path).await,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            Ok(buf)
        }
    }
}

fn rechunk(capture: &[u8], size: usize) -> Vec<Bytes> {
    capture.chunks(size).map(Bytes::copy_from_slice).collect()
}

/// Write each record to stdout as one JSON line. Returns the record count.
async fn replay<S>(mut pump: StreamPump<S>) -> Result<usize, ReplayError>
where
    S: tokio_stream::Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    let mut out = tokio::io::stdout();
    let mut count = 0;
    while let Some(item) = pump.next().await {
        let mut line = serde_json::to_vec(&item?)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        count += 1;
    }
    out.flush().await?;
    Ok(count)
}
