use beacon_core::{RoomCode, SdpKind};
use beacon_session::registry::{MemoryRegistry, RoomRegistry};
use beacon_session::session::SessionNotice;
use beacon_session::transport::LocalRelay;
use beacon_session::{Politeness, Role};
use std::sync::Arc;

use crate::utils::{init_tracing, join_party, wait_for_notice};

#[tokio::test]
async fn two_parties_negotiate_to_stable() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("4821").unwrap();

    // First joiner creates the record and drives the offer.
    let mut alice = join_party(&relay, &registry, &code).await.unwrap();
    assert_eq!(alice.assignment.role, Role::Initiator);
    assert_eq!(alice.assignment.politeness, Politeness::Impolite);
    let room = registry.get_room(&code).await.unwrap().unwrap();
    assert!(room.is_active);

    // Second joiner finds the room live and defers.
    let mut bob = join_party(&relay, &registry, &code).await.unwrap();
    assert_eq!(bob.assignment.role, Role::Responder);
    assert_eq!(bob.assignment.politeness, Politeness::Polite);

    // Presence sync shows Bob to Alice, Alice offers, Bob answers, both
    // sides converge.
    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .expect("initiator never reached stable");
    wait_for_notice(&mut bob.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .expect("responder never reached stable");

    // Each side holds exactly one link with both descriptions applied.
    let alice_links = alice.connector.links();
    let bob_links = bob.connector.links();
    assert_eq!(alice_links.len(), 1);
    assert_eq!(bob_links.len(), 1);

    let alice_link = &alice_links[0];
    let bob_link = &bob_links[0];
    assert_eq!(
        alice_link.local_description().map(|d| d.kind),
        Some(SdpKind::Offer)
    );
    assert_eq!(
        alice_link.remote_description().map(|d| d.kind),
        Some(SdpKind::Answer)
    );
    assert_eq!(
        bob_link.remote_description().map(|d| d.kind),
        Some(SdpKind::Offer)
    );
    assert_eq!(
        bob_link.local_description().map(|d| d.kind),
        Some(SdpKind::Answer)
    );
}

#[tokio::test]
async fn trickle_candidates_cross_the_relay() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("7310").unwrap();

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

    // Loopback links trickle two candidates per applied local description;
    // each side must end up with the peer's, in their original order.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let alice_applied = alice.connector.links()[0].applied_candidates();
        let bob_applied = bob.connector.links()[0].applied_candidates();
        if alice_applied.len() >= 2 && bob_applied.len() >= 2 {
            assert!(alice_applied[0].candidate < alice_applied[1].candidate);
            assert!(bob_applied[0].candidate < bob_applied[1].candidate);
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "candidates never arrived: alice={} bob={}",
                alice_applied.len(),
                bob_applied.len()
            );
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
