use beacon_core::{IceCandidate, RoomCode, SessionDescription, SignalEvent};
use beacon_session::Role;
use beacon_session::registry::{MemoryRegistry, RoomRegistry};
use beacon_session::session::SessionNotice;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{RelayProbe, init_tracing, join_party, wait_for_notice};

fn candidate(n: u8) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 198.51.100.{n} 443 typ relay"),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
    }
}

/// Candidates racing ahead of their offer across the relay must be held and
/// applied in arrival order once the remote description lands.
#[tokio::test]
async fn early_candidates_apply_in_order_after_offer() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("2277").unwrap();
    registry.upsert_room(&code, true).await.unwrap();

    // Responder: will not offer, only react.
    let mut carol = join_party(&relay, &registry, &code).await.unwrap();
    assert_eq!(carol.assignment.role, Role::Responder);

    let peer = RelayProbe::attach_to_room(&relay, &code).await.unwrap();

    // Out-of-order delivery: network paths first, offer afterwards.
    for n in 1..=3 {
        peer.send(SignalEvent::IceCandidate {
            candidate: candidate(n),
        })
        .await
        .unwrap();
    }
    peer.send(SignalEvent::Offer {
        offer: SessionDescription::offer("v=0 peer-offer"),
        participant_id: None,
    })
    .await
    .unwrap();

    wait_for_notice(&mut carol.notices, |n| {
        matches!(n, SessionNotice::NegotiationStable)
    })
    .await
    .unwrap();

    let links = carol.connector.links();
    assert_eq!(links.len(), 1);
    let applied = links[0].applied_candidates();
    assert_eq!(applied.len(), 3);
    for (i, c) in applied.iter().enumerate() {
        assert!(
            c.candidate.starts_with(&format!("candidate:{}", i + 1)),
            "candidate {i} out of order: {}",
            c.candidate
        );
    }
}
