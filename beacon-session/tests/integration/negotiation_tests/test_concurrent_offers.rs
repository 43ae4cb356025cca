use beacon_core::RoomCode;
use beacon_session::Role;
use beacon_session::registry::MemoryRegistry;
use beacon_session::session::SessionNotice;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{init_tracing, join_party, wait_for_notice};

/// Both parties believe they are the initiator (their registries diverged),
/// so both offer into the same room: textbook glare. Each side must yield to
/// the incoming offer and converge to a stable negotiation, never deadlock
/// with two outstanding offers.
#[tokio::test]
async fn concurrent_offers_converge_without_deadlock() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry_a = Arc::new(MemoryRegistry::new());
    let registry_b = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("6183").unwrap();

    let mut alice = join_party(&relay, &registry_a, &code).await.unwrap();
    let mut bob = join_party(&relay, &registry_b, &code).await.unwrap();
    assert_eq!(alice.assignment.role, Role::Initiator);
    assert_eq!(bob.assignment.role, Role::Initiator);

    wait_for_notice(&mut alice.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .expect("alice stuck mid-negotiation");
    wait_for_notice(&mut bob.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .expect("bob stuck mid-negotiation");

    // At least one side rolled its own offer back to answer the peer's:
    // its first link was discarded and a fresh one carries the answer.
    let rolled_back = alice.connector.links().first().is_some_and(|l| l.is_closed())
        || bob.connector.links().first().is_some_and(|l| l.is_closed());
    assert!(rolled_back, "neither side yielded during glare");
}
