use beacon_core::{RoomCode, SignalEvent};
use beacon_session::SessionConfig;
use beacon_session::registry::MemoryRegistry;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{RelayProbe, init_tracing, join_party_with};

/// The announcer fires once as soon as the subscription is confirmed and
/// then keeps advertising on the interval.
#[tokio::test]
async fn room_active_heartbeats_reach_the_discovery_topic() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("7777").unwrap();

    let mut lobby = RelayProbe::attach(&relay, "room-discovery").await.unwrap();

    let config = SessionConfig {
        presence_interval: std::time::Duration::from_millis(100),
        ..SessionConfig::default()
    };
    let _host = join_party_with(&relay, &registry, &code, config)
        .await
        .unwrap();

    let mut timestamps = Vec::new();
    for _ in 0..2 {
        let signal = lobby
            .next_signal(|s| matches!(s, SignalEvent::RoomActive { .. }))
            .await
            .expect("heartbeat never arrived");
        match signal {
            SignalEvent::RoomActive {
                room_code,
                timestamp,
            } => {
                assert_eq!(room_code, code);
                timestamps.push(timestamp);
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }
    assert!(timestamps[0] <= timestamps[1]);
}
