use beacon_core::{RoomCode, SignalEvent};
use beacon_session::registry::{MemoryRegistry, RoomRegistry};
use beacon_session::session::SessionNotice;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{RelayProbe, init_tracing, join_party, wait_for_notice};

#[tokio::test]
async fn end_call_closes_links_and_deactivates_room() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("9042").unwrap();

    let mut alice = join_party(&relay, &registry, &code).await.unwrap();
    let mut bob = join_party(&relay, &registry, &code).await.unwrap();
    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();
    wait_for_notice(&mut bob.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();

    // Add one spectator so teardown has fan-out state to release.
    let mut viewer = RelayProbe::attach_to_room(&relay, &code).await.unwrap();
    viewer.send(SignalEvent::SpectatorReady).await.unwrap();
    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::SpectatorJoined(_))
    })
    .await
    .unwrap();

    alice.handle.end_call().await.unwrap();
    wait_for_notice(&mut alice.notices, |n| matches!(n, SessionNotice::CallEnded))
        .await
        .unwrap();

    // Every link this side ever opened is closed, primary and fan-out alike.
    assert!(alice.connector.links().iter().all(|l| l.is_closed()));
    let room = registry.get_room(&code).await.unwrap().unwrap();
    assert!(!room.is_active);

    // Commands against the ended session fail cleanly.
    assert!(alice.handle.end_call().await.is_err());
}

#[tokio::test]
async fn spectator_ready_can_target_either_party() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("5566").unwrap();

    let mut alice = join_party(&relay, &registry, &code).await.unwrap();
    let mut bob = join_party(&relay, &registry, &code).await.unwrap();
    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();
    wait_for_notice(&mut bob.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();

    // The ready broadcast reaches both parties; each opens its own one-way
    // feed toward the viewer.
    let mut viewer = RelayProbe::attach_to_room(&relay, &code).await.unwrap();
    viewer.send(SignalEvent::SpectatorReady).await.unwrap();

    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::SpectatorJoined(_))
    })
    .await
    .unwrap();
    wait_for_notice(&mut bob.notices, |n| {
        matches!(n, SessionNotice::SpectatorJoined(_))
    })
    .await
    .unwrap();

    assert_eq!(alice.connector.link_count(), 2);
    assert_eq!(bob.connector.link_count(), 2);
}
