use crate::error::MediaError;
use crate::media::{LinkOrigin, LinkState, MediaConnector, MediaEvent, MediaLink, TrackKind};
use async_trait::async_trait;
use beacon_core::{IceCandidate, SdpKind, SessionDescription};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Deterministic in-process media capability for tests and demos.
///
/// Fabricates descriptions and candidates instead of negotiating real
/// transports, and records everything applied to it for inspection.
pub struct LoopbackConnector {
    ready: AtomicBool,
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
    trickle: bool,
    reject_marker: Option<String>,
    seq: AtomicU64,
    links: Mutex<Vec<Arc<LoopbackLink>>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(true),
            trickle: true,
            reject_marker: None,
            seq: AtomicU64::new(0),
            links: Mutex::new(Vec::new()),
        }
    }

    /// Start with local media unavailable (`media_ready` false).
    pub fn without_media(mut self) -> Self {
        self.ready = AtomicBool::new(false);
        self
    }

    /// Suppress synthetic trickle candidates.
    pub fn without_trickle(mut self) -> Self {
        self.trickle = false;
        self
    }

    /// Links reject any candidate whose payload contains `marker`.
    pub fn rejecting_candidates_containing(mut self, marker: &str) -> Self {
        self.reject_marker = Some(marker.to_string());
        self
    }

    pub fn set_media_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Every link this connector has built, in creation order.
    pub fn links(&self) -> Vec<Arc<LoopbackLink>> {
        self.links.lock().clone()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().len()
    }
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaConnector for LoopbackConnector {
    fn media_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

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
        if !self.media_ready() {
            return Err(MediaError::NotReady);
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let link = Arc::new(LoopbackLink {
            seq,
            origin,
            trickle: self.trickle,
            reject_marker: self.reject_marker.clone(),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            applied_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            events,
        });
        self.links.lock().push(Arc::clone(&link));
        Ok(link)
    }
}

pub struct LoopbackLink {
    seq: u64,
    origin: LinkOrigin,
    trickle: bool,
    reject_marker: Option<String>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    applied_candidates: Mutex<Vec<IceCandidate>>,
    closed: AtomicBool,
    events: mpsc::Sender<MediaEvent>,
}

impl LoopbackLink {
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.applied_candidates.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), MediaError> {
        if self.is_closed() {
            return Err(MediaError::Link("link closed".to_string()));
        }
        Ok(())
    }

    fn sdp(&self, label: &str) -> String {
        format!("v=0\r\no=loopback-{} {} 0 IN IP4 127.0.0.1\r\ns=-\r\n", self.seq, label)
    }

    async fn emit_trickle(&self) {
        if !self.trickle {
            return;
        }
        for n in 0..2u8 {
            let candidate = IceCandidate {
                candidate: format!(
                    "candidate:{}{} 1 udp 2122260223 192.0.2.{} 54555 typ host",
                    self.seq,
                    n,
                    n + 1
                ),
                sdp_mid: Some("0".to_string()),
                sdp_m_line_index: Some(0),
            };
            let _ = self
                .events
                .send(MediaEvent::CandidateGenerated {
                    origin: self.origin.clone(),
                    candidate,
                })
                .await;
        }
    }
}

#[async_trait]
impl MediaLink for LoopbackLink {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError> {
        self.check_open()?;
        Ok(SessionDescription::offer(self.sdp("offer")))
    }

    async fn create_answer(&self) -> Result<SessionDescription, MediaError> {
        self.check_open()?;
        let has_remote_offer = matches!(
            self.remote.lock().as_ref(),
            Some(desc) if desc.kind == SdpKind::Offer
        );
        if !has_remote_offer {
            return Err(MediaError::Sdp("no remote offer to answer".to_string()));
        }
        Ok(SessionDescription::answer(self.sdp("answer")))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.check_open()?;
        *self.local.lock() = Some(desc);
        self.emit_trickle().await;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError> {
        self.check_open()?;
        *self.remote.lock() = Some(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), MediaError> {
        self.check_open()?;
        if self.remote.lock().is_none() {
            return Err(MediaError::Link(
                "candidate before remote description".to_string(),
            ));
        }
        if let Some(marker) = &self.reject_marker {
            if candidate.candidate.contains(marker.as_str()) {
                return Err(MediaError::Link("synthetic candidate failure".to_string()));
            }
        }
        self.applied_candidates.lock().push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<(), MediaError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(seq = self.seq, "loopback link closed");
        let _ = self
            .events
            .send(MediaEvent::LinkStateChanged {
                origin: self.origin.clone(),
                state: LinkState::Closed,
            })
            .await;
        Ok(())
    }
}
