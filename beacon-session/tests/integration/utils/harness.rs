use anyhow::{Context, Result, bail};
use beacon_core::{MemberKey, RoomCode, SignalEvent};
use beacon_session::media::LoopbackConnector;
use beacon_session::registry::MemoryRegistry;
use beacon_session::session::{Session, SessionHandle, SessionNotice};
use beacon_session::{RoleAssignment, SessionConfig};
use beacon_session::transport::{LocalEndpoint, LocalRelay, SignalingTransport, TransportEvent, room_topic};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::NOTICE_TIMEOUT_MS;

/// One in-process participant: a running session over the shared relay and
/// registry, with its connector kept around for link inspection.
pub struct TestParty {
    pub handle: SessionHandle,
    pub notices: broadcast::Receiver<SessionNotice>,
    pub connector: Arc<LoopbackConnector>,
    pub member_key: MemberKey,
    pub assignment: RoleAssignment,
}

pub async fn join_party(
    relay: &Arc<LocalRelay>,
    registry: &Arc<MemoryRegistry>,
    code: &RoomCode,
) -> Result<TestParty> {
    join_party_with(relay, registry, code, SessionConfig::default()).await
}

pub async fn join_party_with(
    relay: &Arc<LocalRelay>,
    registry: &Arc<MemoryRegistry>,
    code: &RoomCode,
    config: SessionConfig,
) -> Result<TestParty> {
    let member_key = MemberKey::generate();
    let connector = Arc::new(LoopbackConnector::new());
    let endpoint = Arc::new(relay.endpoint(member_key.clone()));

    let (session, handle) = Session::join(
        code.clone(),
        endpoint,
        registry.clone(),
        connector.clone(),
        config,
    )
    .await
    .context("session join failed")?;
    let assignment = session.assignment();
    let notices = handle.subscribe();
    tokio::spawn(session.run());

    Ok(TestParty {
        handle,
        notices,
        connector,
        member_key,
        assignment,
    })
}

/// Wait until a notice matching `matches` arrives, skipping others.
pub async fn wait_for_notice(
    notices: &mut broadcast::Receiver<SessionNotice>,
    matches: impl Fn(&SessionNotice) -> bool,
) -> Result<SessionNotice> {
    let deadline = std::time::Duration::from_millis(NOTICE_TIMEOUT_MS);
    let fut = async {
        loop {
            match notices.recv().await {
                Ok(notice) if matches(&notice) => return Ok(notice),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("notice channel closed"),
            }
        }
    };
    tokio::time::timeout(deadline, fut)
        .await
        .context("timed out waiting for notice")?
}

/// A bare relay endpoint on the room topic, standing in for the viewer-side
/// flow: captures broadcasts and can inject spectator events.
pub struct RelayProbe {
    pub endpoint: LocalEndpoint,
    events: mpsc::Receiver<TransportEvent>,
    topic: String,
}

impl RelayProbe {
    pub async fn attach(relay: &Arc<LocalRelay>, topic: &str) -> Result<Self> {
        let endpoint = relay.endpoint(MemberKey::generate());
        let mut events = endpoint
            .subscribe(topic)
            .await
            .context("probe subscribe failed")?;
        match events.recv().await {
            Some(TransportEvent::Subscribed) => {}
            other => bail!("expected subscription ack, got {other:?}"),
        }
        Ok(Self {
            endpoint,
            events,
            topic: topic.to_string(),
        })
    }

    pub async fn attach_to_room(relay: &Arc<LocalRelay>, code: &RoomCode) -> Result<Self> {
        Self::attach(relay, &room_topic(code)).await
    }

    /// Appear in the topic's presence set, like a real participant would.
    pub async fn track(&self) -> Result<()> {
        self.endpoint
            .track_presence(&self.topic)
            .await
            .context("probe presence tracking failed")
    }

    pub async fn send(&self, event: SignalEvent) -> Result<()> {
        self.endpoint
            .broadcast(&self.topic, event)
            .await
            .context("probe broadcast failed")
    }

    /// Next broadcast signal matching `matches`, skipping everything else.
    pub async fn next_signal(
        &mut self,
        matches: impl Fn(&SignalEvent) -> bool,
    ) -> Result<SignalEvent> {
        let deadline = std::time::Duration::from_millis(super::SIGNAL_TIMEOUT_MS);
        let fut = async {
            loop {
                match self.events.recv().await {
                    Some(TransportEvent::Signal(signal)) if matches(&signal) => {
                        return Ok(signal);
                    }
                    Some(_) => continue,
                    None => bail!("probe channel closed"),
                }
            }
        };
        tokio::time::timeout(deadline, fut)
            .await
            .context("timed out waiting for signal")?
    }
}
