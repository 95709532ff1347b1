//! Host request channel and broadcast observer.
//!
//! [`gateway_channel`] pairs a cloneable [`GatewayClient`] with a
//! [`GatewayServer`] that executes requests against the [`RequestGateway`].
//! [`ChannelObserver`] publishes coordinator UI effects on the same
//! broadcast channel the client subscribes to.

use crate::error::{Result, UpdateError};
use crate::host::contract::{EventEnvelope, HostMessage, RequestEnvelope, ResponseEnvelope};
use crate::host::gateway::RequestGateway;
use crate::update::observer::{MenuItemState, UpdateNotification, UpdateObserver, UserDialog};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};

struct GatewayRequest {
    envelope: RequestEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct GatewayClient {
    request_tx: mpsc::Sender<GatewayRequest>,
    event_tx: broadcast::Sender<HostMessage>,
}

impl GatewayClient {
    pub async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            UpdateError::Channel(format!(
                "invalid host request envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(GatewayRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| UpdateError::Channel(format!("failed to send host request: {e}")))?;

        response_rx
            .await
            .map_err(|e| UpdateError::Channel(format!("host response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<HostMessage> {
        self.event_tx.subscribe()
    }
}

pub struct GatewayServer {
    request_rx: mpsc::Receiver<GatewayRequest>,
    gateway: Arc<RequestGateway>,
}

/// Create a request channel sharing `event_tx` with the observer.
#[must_use]
pub fn gateway_channel(
    request_capacity: usize,
    event_tx: broadcast::Sender<HostMessage>,
    gateway: Arc<RequestGateway>,
) -> (GatewayClient, GatewayServer) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));
    (
        GatewayClient {
            request_tx,
            event_tx,
        },
        GatewayServer {
            request_rx,
            gateway,
        },
    )
}

impl GatewayServer {
    /// Serve requests until every client is dropped.
    ///
    /// Each request runs on its own task so a long check does not hold up an
    /// `install` or `open-release` sent behind it.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let gateway = Arc::clone(&self.gateway);
            tokio::spawn(async move {
                let GatewayRequest {
                    envelope,
                    response_tx,
                } = request;
                let response = gateway.handle(&envelope.operation).await;
                let _ = response_tx.send(ResponseEnvelope::new(envelope.request_id, response));
            });
        }
        tracing::debug!("gateway request channel closed");
    }
}

/// [`UpdateObserver`] that publishes every effect as a [`HostMessage`].
pub struct ChannelObserver {
    event_tx: broadcast::Sender<HostMessage>,
    alive: AtomicBool,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
        Self::with_sender(event_tx)
    }

    #[must_use]
    pub fn with_sender(event_tx: broadcast::Sender<HostMessage>) -> Self {
        Self {
            event_tx,
            alive: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn sender(&self) -> broadcast::Sender<HostMessage> {
        self.event_tx.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HostMessage> {
        self.event_tx.subscribe()
    }

    /// Mark the UI surface as gone; later effects are dropped.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn publish(&self, message: HostMessage) {
        if self.event_tx.send(message).is_err() {
            tracing::debug!("no host event subscribers; dropping message");
        }
    }
}

impl UpdateObserver for ChannelObserver {
    fn update_menu(&self, item: MenuItemState) {
        self.publish(HostMessage::Menu(item));
    }

    fn notify(&self, notification: UpdateNotification) {
        self.publish(HostMessage::Notification(EventEnvelope::from(&notification)));
    }

    fn acknowledge(&self, dialog: UserDialog) {
        self.publish(HostMessage::Dialog(dialog));
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
