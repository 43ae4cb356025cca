use crate::error::MediaError;
use crate::media::{LinkOrigin, LinkState, MediaConnector, MediaEvent, MediaLink, TrackKind};
use async_trait::async_trait;
use beacon_core::{IceCandidate, SdpKind, SessionDescription};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_local::TrackLocal;

/// STUN/TURN configuration for real peer links.
#[derive(Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

/// [`MediaConnector`] backed by real peer connections.
///
/// All links built here share the connector's current local tracks by
/// reference; `replace_tracks` swaps them on every live sender so device
/// changes reach the primary and all spectator links in one call.
pub struct RtcConnector {
    config: RtcConfig,
    tracks: Mutex<Vec<Arc<dyn TrackLocal + Send + Sync>>>,
    links: Mutex<Vec<std::sync::Weak<RtcLink>>>,
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
}

impl RtcConnector {
    pub fn new(config: RtcConfig) -> Self {
        Self {
            config,
            tracks: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(true),
        }
    }

    /// Install the local tracks future links will attach. The device-acquire
    /// flow that produces them is external.
    pub fn set_tracks(&self, tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) {
        *self.tracks.lock() = tracks;
    }

    /// Swap local tracks on every live link's matching senders, then install
    /// them for future links.
    pub async fn replace_tracks(
        &self,
        tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    ) -> Result<(), MediaError> {
        let live: Vec<Arc<RtcLink>> = {
            let mut links = self.links.lock();
            links.retain(|l| l.strong_count() > 0);
            links.iter().filter_map(|l| l.upgrade()).collect()
        };
        for link in live {
            for sender in link.pc.get_senders().await {
                let Some(current) = sender.track().await else {
                    continue;
                };
                let replacement = tracks
                    .iter()
                    .find(|t| t.kind() == current.kind())
                    .cloned();
                if let Some(track) = replacement {
                    sender
                        .replace_track(Some(track))
                        .await
                        .map_err(|e| MediaError::Link(e.to_string()))?;
                }
            }
        }
        self.set_tracks(tracks);
        Ok(())
    }
}

#[async_trait]
impl MediaConnector for RtcConnector {
    fn media_ready(&self) -> bool {
        !self.tracks.lock().is_empty()
    }

    /// Advisory flags the capture pipeline consults; sample-push tracks have
    /// no enabled bit of their own.
    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let flag = match kind {
            TrackKind::Audio => &self.audio_enabled,
            TrackKind::Video => &self.video_enabled,
        };
        flag.store(enabled, Ordering::SeqCst);
        enabled
    }

    fn track_enabled(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Audio => self.audio_enabled.load(Ordering::SeqCst),
            TrackKind::Video => self.video_enabled.load(Ordering::SeqCst),
        }
    }

    async fn connect(
        &self,
        origin: LinkOrigin,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Arc<dyn MediaLink>, MediaError> {
        let tracks = self.tracks.lock().clone();
        if tracks.is_empty() {
            return Err(MediaError::NotReady);
        }

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| MediaError::Link(e.to_string()))?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| MediaError::Link(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                credential: String::new(),
                username: String::new(),
            }],
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| MediaError::Link(e.to_string()))?,
        );

        for track in tracks {
            pc.add_track(track)
                .await
                .map_err(|e| MediaError::Link(e.to_string()))?;
        }

        let state_tx = events.clone();
        let state_origin = origin.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let origin = state_origin.clone();
            Box::pin(async move {
                info!(?origin, state = ?s, "peer link state changed");
                let _ = tx
                    .send(MediaEvent::LinkStateChanged {
                        origin,
                        state: map_link_state(s),
                    })
                    .await;
            })
        }));

        let ice_tx = events.clone();
        let ice_origin = origin.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let origin = ice_origin.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    warn!("discarding unserializable local candidate");
                    return;
                };
                let _ = tx
                    .send(MediaEvent::CandidateGenerated {
                        origin,
                        candidate: IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        },
                    })
                    .await;
            })
        }));

        let link = Arc::new(RtcLink { pc });
        self.links.lock().push(Arc::downgrade(&link));
        Ok(link)
    }
}

/// One live peer connection behind the [`MediaLink`] surface.
pub struct RtcLink {
    pc: Arc<RTCPeerConnection>,
}

fn map_link_state(state: RTCPeerConnectionState) -> LinkState {
    match state {
        RTCPeerConnectionState::Connecting => LinkState::Connecting,
        RTCPeerConnectionState::Connected => LinkState::Connected,
        RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
        RTCPeerConnectionState::Failed => LinkState::Failed,
        RTCPeerConnectionState::Closed => LinkState::Closed,
        _ => LinkState::New,
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, MediaError> {
    let result = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    result.map_err(|e| MediaError::Sdp(e.to_string()))
}

#[async_trait]
impl MediaLink for RtcLink {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| MediaError::Link(e.to_string()))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| MediaError::Link(e.to_string()))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.pc
            .set_local_description(to_rtc_description(desc)?)
            .await
            .map_err(|e| MediaError::Link(e.to_string()))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.pc
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .map_err(|e| MediaError::Link(e.to_string()))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), MediaError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: None,
            })
            .await
            .map_err(|e| MediaError::Link(e.to_string()))
    }

    async fn close(&self) -> Result<(), MediaError> {
        self.pc
            .close()
            .await
            .map_err(|e| MediaError::Link(e.to_string()))
    }
}
