//! Change-notification transports.
//!
//! A transport turns a subscription for a set of entities into a stream of
//! [`TransportSignal`]s. Delivery is at-least-once; nothing here
//! deduplicates. Reconnecting after a failure is the transport's concern.

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Result, SyncError};
use crate::types::{ChangeEvent, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum TransportStatus {
    Connecting,
    Connected,
    ChannelError(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Status(TransportStatus),
    Change(ChangeEvent),
}

pub trait ChangeTransport: Send + Sync {
    fn subscribe(&self, entities: &[Entity]) -> BoxStream<'static, TransportSignal>;
}

fn watched(entities: &[Entity], signal: &TransportSignal) -> bool {
    match signal {
        TransportSignal::Change(event) => entities.contains(&event.entity),
        TransportSignal::Status(_) => true,
    }
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// In-process transport fed through a [`ChangeFeed`] handle.
///
/// Only one subscription is served; a second `subscribe` yields a single
/// `ChannelError` status.
pub struct ChannelTransport {
    rx: Mutex<Option<mpsc::UnboundedReceiver<TransportSignal>>>,
}

/// Producer side of a [`ChannelTransport`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: mpsc::UnboundedSender<TransportSignal>,
}

impl ChannelTransport {
    pub fn new() -> (Self, ChangeFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            ChangeFeed { tx },
        )
    }
}

impl ChangeTransport for ChannelTransport {
    fn subscribe(&self, entities: &[Entity]) -> BoxStream<'static, TransportSignal> {
        let Some(rx) = self.rx.lock().take() else {
            return stream::iter([TransportSignal::Status(TransportStatus::ChannelError(
                "channel already subscribed".into(),
            ))])
            .boxed();
        };

        let entities = entities.to_vec();
        let handshake = stream::iter([
            TransportSignal::Status(TransportStatus::Connecting),
            TransportSignal::Status(TransportStatus::Connected),
        ]);
        let incoming = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|signal| (signal, rx))
        });

        handshake
            .chain(incoming)
            .filter(move |signal| futures::future::ready(watched(&entities, signal)))
            .boxed()
    }
}

impl ChangeFeed {
    pub fn publish(&self, event: ChangeEvent) -> Result<()> {
        self.send(TransportSignal::Change(event))
    }

    pub fn status(&self, status: TransportStatus) -> Result<()> {
        self.send(TransportSignal::Status(status))
    }

    fn send(&self, signal: TransportSignal) -> Result<()> {
        self.tx
            .send(signal)
            .map_err(|_| SyncError::ConnectionFailure("change subscription closed".into()))
    }
}

// ---------------------------------------------------------------------------
// ReplayTransport
// ---------------------------------------------------------------------------

/// Replays a recorded list of signals on every subscription.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    signals: Vec<TransportSignal>,
}

impl ReplayTransport {
    pub fn new(signals: Vec<TransportSignal>) -> Self {
        Self { signals }
    }

    /// `Connected` followed by the given events.
    pub fn connected(events: impl IntoIterator<Item = ChangeEvent>) -> Self {
        let mut signals = vec![TransportSignal::Status(TransportStatus::Connected)];
        signals.extend(events.into_iter().map(TransportSignal::Change));
        Self { signals }
    }
}

impl ChangeTransport for ReplayTransport {
    fn subscribe(&self, entities: &[Entity]) -> BoxStream<'static, TransportSignal> {
        let signals: Vec<_> = self
            .signals
            .iter()
            .filter(|s| watched(entities, s))
            .cloned()
            .collect();
        stream::iter(signals).boxed()
    }
}
