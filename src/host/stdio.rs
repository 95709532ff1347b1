//! Stdin/stdout JSON bridge for the host gateway.
//!
//! Reads newline-delimited JSON [`RequestEnvelope`] messages, dispatches them
//! through the gateway channel, and writes [`HostMessage`] values (responses,
//! notifications, menu states, dialogs) as newline-delimited JSON.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use crate::error::{Result, UpdateError};
use crate::host::channel::{GatewayClient, gateway_channel};
use crate::host::contract::{HostMessage, RequestEnvelope, ResponseEnvelope};
use crate::host::gateway::RequestGateway;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default request channel capacity for the stdio bridge.
pub const REQUEST_CAPACITY: usize = 64;

/// Run the bridge on the process's stdin/stdout.
///
/// Returns when stdin closes or `shutdown` is cancelled.
pub async fn run_stdio_bridge(
    gateway: Arc<RequestGateway>,
    event_tx: broadcast::Sender<HostMessage>,
    request_capacity: usize,
    shutdown: CancellationToken,
) -> Result<()> {
    run_bridge(
        BufReader::new(tokio::io::stdin()),
        BufWriter::new(tokio::io::stdout()),
        gateway,
        event_tx,
        request_capacity,
        shutdown,
    )
    .await
}

/// Run the bridge over arbitrary line-oriented I/O.
///
/// Three concurrent tasks operate in parallel:
///
/// 1. **Reader** -- reads newline-delimited JSON and dispatches each request
///    on its own task, which writes the response when it completes.
/// 2. **Event forwarder** -- writes broadcast host messages, dropping
///    notifications whose name is outside the fixed set.
/// 3. **Server** -- runs the gateway request loop.
pub async fn run_bridge<R, W>(
    reader: R,
    writer: W,
    gateway: Arc<RequestGateway>,
    event_tx: broadcast::Sender<HostMessage>,
    request_capacity: usize,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (client, server) = gateway_channel(request_capacity, event_tx, gateway);
    let writer = Arc::new(Mutex::new(writer));

    let server_handle = tokio::spawn(server.run());

    let event_writer = Arc::clone(&writer);
    let mut event_rx = client.subscribe_events();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(message) => {
                    if !message.is_forwardable() {
                        tracing::warn!(?message, "dropping host message outside the notification set");
                        continue;
                    }
                    if let Err(e) = write_message(&event_writer, &message).await {
                        tracing::warn!(
                            error = %e,
                            "failed to write host message; stopping event forwarder"
                        );
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event broadcast channel closed; stopping event forwarder");
                    break;
                }
            }
        }
    });

    let reader_result = tokio::select! {
        result = run_reader(reader, client, Arc::clone(&writer)) => result,
        _ = shutdown.cancelled() => {
            tracing::info!("shutdown requested; stopping host bridge");
            Ok(())
        }
    };

    event_handle.abort();
    let _ = event_handle.await;
    let _ = server_handle.await;

    reader_result
}

async fn run_reader<R, W>(
    reader: R,
    client: GatewayClient,
    writer: Arc<Mutex<W>>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = reader.lines();
    // One task per request; responses may be written out of order.
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to read request line: {e}")))?
    {
        // Reap finished dispatches.
        while in_flight.try_join_next().is_some() {}

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: RequestEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse request envelope");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse request envelope: {e}"),
                );
                write_message(&writer, &HostMessage::Response(response)).await?;
                continue;
            }
        };

        in_flight.spawn(dispatch_request(
            envelope,
            client.clone(),
            Arc::clone(&writer),
        ));
    }

    tracing::info!("request stream closed (EOF); draining in-flight requests");
    while in_flight.join_next().await.is_some() {}
    tracing::info!("host bridge reader finished");
    Ok(())
}

/// Send one request through the gateway and write its response.
async fn dispatch_request<W>(
    envelope: RequestEnvelope,
    client: GatewayClient,
    writer: Arc<Mutex<W>>,
) where
    W: AsyncWrite + Unpin,
{
    let request_id = envelope.request_id.clone();
    let response = match client.send(envelope).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, "host request dispatch failed");
            ResponseEnvelope::error(request_id, format!("dispatch failed: {e}"))
        }
    };
    if let Err(e) = write_message(&writer, &HostMessage::Response(response)).await {
        tracing::warn!(error = %e, "failed to write host response");
    }
}

/// Serialize one message as a JSON line and flush.
async fn write_message<W>(writer: &Mutex<W>, message: &HostMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)
        .map_err(|e| UpdateError::Channel(format!("failed to serialize host message: {e}")))?;

    let mut w = writer.lock().await;
    w.write_all(json.as_bytes())
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to write host message: {e}")))?;
    w.write_all(b"\n")
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to write newline: {e}")))?;
    w.flush()
        .await
        .map_err(|e| UpdateError::Channel(format!("failed to flush host output: {e}")))?;
    Ok(())
}
