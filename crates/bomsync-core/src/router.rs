//! Change notification router.
//!
//! Routing is a pure function of the event and the mode *at the moment the
//! event arrives*; [`decide`] never sees a cached mode. [`ChangeRouter`]
//! wires that decision to a transport subscription and the orchestrator.

use futures::stream::{BoxStream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::activity_log::Severity;
use crate::collab::RefreshTarget;
use crate::orchestrator::Orchestrator;
use crate::transport::{ChangeTransport, TransportSignal, TransportStatus};
use crate::types::{ChangeEvent, ConnectionStatus, Entity, SyncMode, SyncTriggerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// Refresh the display and start a realtime sync.
    TriggerSync,
    /// Refresh the display only; the change waits for the schedule or a
    /// manual sync.
    RefreshOnly,
}

pub fn decide(_event: &ChangeEvent, mode: SyncMode) -> RouteAction {
    match mode {
        SyncMode::Live => RouteAction::TriggerSync,
        SyncMode::Scheduled | SyncMode::Manual => RouteAction::RefreshOnly,
    }
}

/// Display target re-fetched when `entity` changes. The tree view shows both
/// assemblies and components.
pub fn refresh_target(entity: Entity) -> RefreshTarget {
    match entity {
        Entity::Assembly | Entity::Component => RefreshTarget::Tree,
    }
}

#[derive(Debug, Clone)]
pub struct ChangeRouter {
    engine: Orchestrator,
}

impl ChangeRouter {
    pub fn new(engine: Orchestrator) -> Self {
        Self { engine }
    }

    /// Subscribe once to both entities and route signals until the
    /// transport's stream ends.
    pub fn spawn(self, transport: &dyn ChangeTransport) -> JoinHandle<()> {
        let stream = transport.subscribe(Entity::all());
        tokio::spawn(self.run(stream))
    }

    pub async fn run(self, mut stream: BoxStream<'static, TransportSignal>) {
        self.engine.set_connection(ConnectionStatus::Connecting);
        while let Some(signal) = stream.next().await {
            self.handle_signal(signal).await;
        }
        debug!("change subscription ended");
    }

    pub async fn handle_signal(&self, signal: TransportSignal) -> Option<RouteAction> {
        match signal {
            TransportSignal::Status(status) => {
                self.handle_status(status);
                None
            }
            TransportSignal::Change(event) => Some(self.handle_change(event).await),
        }
    }

    fn handle_status(&self, status: TransportStatus) {
        match status {
            TransportStatus::Connecting => {
                self.engine.set_connection(ConnectionStatus::Connecting);
            }
            TransportStatus::Connected => {
                self.engine.set_connection(ConnectionStatus::Connected);
                self.engine
                    .log(Severity::Success, "Realtime change notifications connected");
            }
            TransportStatus::ChannelError(message) => {
                self.engine.set_connection(ConnectionStatus::Failed);
                self.engine.log(
                    Severity::Error,
                    format!("Realtime channel error: {message}"),
                );
            }
            TransportStatus::TimedOut => {
                self.engine.set_connection(ConnectionStatus::Failed);
                self.engine
                    .log(Severity::Error, "Realtime subscription timed out");
            }
        }
    }

    /// Start refreshing the affected view and act on the mode read right
    /// now. A slow display API never holds back the realtime sync or the
    /// next event.
    pub async fn handle_change(&self, event: ChangeEvent) -> RouteAction {
        info!(entity = %event.entity, event_type = %event.event_type, "change received");
        let engine = self.engine.clone();
        let target = refresh_target(event.entity);
        tokio::spawn(async move { engine.refresh(target).await });

        let mode = self.engine.mode();
        let action = decide(&event, mode);
        match action {
            RouteAction::TriggerSync => {
                self.engine.log(
                    Severity::Info,
                    format!(
                        "{} {} detected, starting realtime sync",
                        event.entity, event.event_type
                    ),
                );
                let engine = self.engine.clone();
                tokio::spawn(async move {
                    let _ = engine.trigger(SyncTriggerSource::Realtime).await;
                });
            }
            RouteAction::RefreshOnly => {
                self.engine.log(
                    Severity::Info,
                    format!(
                        "{} {} detected, sync deferred ({mode} mode)",
                        event.entity, event.event_type
                    ),
                );
            }
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRefresher, MockRemote};
    use crate::transport::{ChannelTransport, ReplayTransport};
    use crate::types::ChangeKind;
    use std::sync::Arc;
    use std::time::Duration;

    fn update(entity: Entity) -> ChangeEvent {
        ChangeEvent::new(entity, ChangeKind::Update)
    }

    fn setup(mode: SyncMode) -> (ChangeRouter, Arc<MockRemote>, Arc<MockRefresher>) {
        let remote = MockRemote::succeeding();
        let refresher = MockRefresher::new();
        let engine = Orchestrator::builder(remote.clone())
            .refresher(refresher.clone())
            .mode(mode)
            .build()
            .unwrap();
        (ChangeRouter::new(engine), remote, refresher)
    }

    #[test]
    fn decision_depends_only_on_mode() {
        for entity in Entity::all() {
            let event = update(*entity);
            assert_eq!(decide(&event, SyncMode::Live), RouteAction::TriggerSync);
            assert_eq!(decide(&event, SyncMode::Scheduled), RouteAction::RefreshOnly);
            assert_eq!(decide(&event, SyncMode::Manual), RouteAction::RefreshOnly);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn live_change_triggers_once_and_refreshes_once() {
        let (router, remote, refresher) = setup(SyncMode::Live);
        let action = router.handle_change(update(Entity::Assembly)).await;
        assert_eq!(action, RouteAction::TriggerSync);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(remote.calls(), 1);
        let last = router.engine.snapshot().last_trigger.unwrap();
        assert_eq!(last.source, SyncTriggerSource::Realtime);
        // One for the change itself, one from the post-sync refresh set.
        assert_eq!(refresher.count(RefreshTarget::Tree), 2);
        assert_eq!(refresher.count(RefreshTarget::MirrorTable), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_change_refreshes_without_syncing() {
        let (router, remote, refresher) = setup(SyncMode::Manual);
        let action = router.handle_change(update(Entity::Component)).await;
        assert_eq!(action, RouteAction::RefreshOnly);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(remote.calls(), 0);
        assert_eq!(refresher.count(RefreshTarget::Tree), 1);
        let snap = router.engine.snapshot();
        assert!(snap.log.last().unwrap().message.contains("deferred"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refresh_does_not_delay_realtime_sync() {
        let remote = MockRemote::succeeding();
        let refresher = MockRefresher::slow(Duration::from_secs(30));
        let engine = Orchestrator::builder(remote.clone())
            .refresher(refresher.clone())
            .mode(SyncMode::Live)
            .build()
            .unwrap();
        let router = ChangeRouter::new(engine);

        let action = tokio::time::timeout(
            Duration::from_secs(1),
            router.handle_change(update(Entity::Assembly)),
        )
        .await
        .expect("change handling waited on the refresh");
        assert_eq!(action, RouteAction::TriggerSync);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(remote.calls(), 1);
        assert_eq!(refresher.count(RefreshTarget::Tree), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn mode_is_read_per_event() {
        let (router, remote, _) = setup(SyncMode::Manual);
        router.handle_change(update(Entity::Assembly)).await;
        router.engine.set_mode(SyncMode::Live);
        router.handle_change(update(Entity::Assembly)).await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replayed_events_drive_connection_and_triggers() {
        let (router, remote, refresher) = setup(SyncMode::Scheduled);
        let engine = router.engine.clone();
        let transport = ReplayTransport::connected([
            update(Entity::Assembly),
            ChangeEvent::new(Entity::Component, ChangeKind::Insert),
        ]);
        router.spawn(&transport).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(engine.connection(), ConnectionStatus::Connected);
        assert_eq!(refresher.count(RefreshTarget::Tree), 2);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn channel_error_marks_connection_failed() {
        let (router, _, _) = setup(SyncMode::Live);
        let engine = router.engine.clone();
        let transport = ReplayTransport::new(vec![
            TransportSignal::Status(TransportStatus::Connected),
            TransportSignal::Status(TransportStatus::ChannelError("socket closed".into())),
        ]);
        router.spawn(&transport).await.unwrap();

        assert_eq!(engine.connection(), ConnectionStatus::Failed);
        let snap = engine.snapshot();
        let last = snap.log.last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert!(last.message.contains("socket closed"));
    }

    #[tokio::test]
    async fn channel_transport_feeds_router() {
        let (router, _, refresher) = setup(SyncMode::Manual);
        let engine = router.engine.clone();
        let (transport, feed) = ChannelTransport::new();
        let handle = router.spawn(&transport);

        feed.publish(update(Entity::Component)).unwrap();
        feed.status(TransportStatus::TimedOut).unwrap();
        drop(feed);
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(refresher.count(RefreshTarget::Tree), 1);
        assert_eq!(engine.connection(), ConnectionStatus::Failed);
    }
}
