use beacon_core::{RoomCode, SessionDescription, SignalEvent};
use beacon_session::Role;
use beacon_session::registry::MemoryRegistry;
use beacon_session::session::SessionNotice;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{RelayProbe, init_tracing, join_party, wait_for_notice};

/// A replayed answer must not reach the link a second time.
#[tokio::test]
async fn replayed_answer_is_dropped() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("8414").unwrap();

    let mut dave = join_party(&relay, &registry, &code).await.unwrap();
    assert_eq!(dave.assignment.role, Role::Initiator);

    // A tracked peer appears, which triggers Dave's offer.
    let mut peer = RelayProbe::attach_to_room(&relay, &code).await.unwrap();
    peer.track().await.unwrap();
    peer.next_signal(|s| matches!(s, SignalEvent::Offer { participant_id: None, .. }))
        .await
        .expect("initiator never offered");

    // First answer is applied, the replay must be ignored.
    peer.send(SignalEvent::Answer {
        answer: SessionDescription::answer("v=0 first-answer"),
    })
    .await
    .unwrap();
    wait_for_notice(&mut dave.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();

    peer.send(SignalEvent::Answer {
        answer: SessionDescription::answer("v=0 replayed-answer"),
    })
    .await
    .unwrap();

    // Give the replay time to (not) land, then inspect the link.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let links = dave.connector.links();
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0].remote_description(),
        Some(SessionDescription::answer("v=0 first-answer"))
    );
}
