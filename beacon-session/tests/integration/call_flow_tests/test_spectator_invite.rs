use beacon_core::RoomCode;
use beacon_session::media::{MediaConnector, TrackKind};
use beacon_session::registry::MemoryRegistry;
use beacon_session::transport::LocalRelay;
use std::sync::Arc;

use crate::utils::{init_tracing, join_party};

#[tokio::test]
async fn share_issues_a_persisted_token_and_viewer_url() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("1199").unwrap();
    let host = join_party(&relay, &registry, &code).await.unwrap();

    let invite = host.handle.share_spectator_link().await.unwrap();

    assert_eq!(invite.token.room_code, code);
    assert!(!invite.token.is_expired(chrono::Utc::now()));
    assert!(invite.url.contains("roomCode=1199"));
    assert!(invite.url.contains(&format!("token={}", invite.token.token)));
    assert_eq!(registry.token_count(), 1);
}

#[tokio::test]
async fn share_surfaces_registry_failure_without_crashing() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("1200").unwrap();
    let host = join_party(&relay, &registry, &code).await.unwrap();

    registry.set_unavailable(true);
    assert!(host.handle.share_spectator_link().await.is_err());

    // The session survives the failed command.
    registry.set_unavailable(false);
    assert!(host.handle.share_spectator_link().await.is_ok());
}

#[tokio::test]
async fn mute_command_reaches_the_shared_tracks() {
    init_tracing();

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());
    let code = RoomCode::parse("1201").unwrap();
    let host = join_party(&relay, &registry, &code).await.unwrap();
    assert!(host.connector.track_enabled(TrackKind::Audio));

    host.handle
        .set_track_enabled(TrackKind::Audio, false)
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while host.connector.track_enabled(TrackKind::Audio) {
        if tokio::time::Instant::now() > deadline {
            panic!("mute never applied");
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(host.connector.track_enabled(TrackKind::Video));
}
