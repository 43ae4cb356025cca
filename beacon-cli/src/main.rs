use anyhow::{Context, Result, bail};
use beacon_core::{MemberKey, RoomCode, SessionDescription, SignalEvent};
use beacon_session::media::LoopbackConnector;
use beacon_session::registry::{MemoryRegistry, RoomRegistry};
use beacon_session::session::{Session, SessionHandle, SessionNotice};
use beacon_session::transport::{LocalRelay, SignalingTransport, TransportEvent, room_topic};
use beacon_session::{Role, SessionConfig};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Relay-signaled P2P call orchestration demo")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full call in-process: two parties negotiate over the local
    /// relay, optional spectators attach one-way feeds.
    Demo {
        /// Room code (4-6 alphanumerics); prompted for when omitted.
        #[arg(long)]
        room: Option<String>,

        /// Number of spectators to attach once the call is stable.
        #[arg(long, default_value_t = 1)]
        spectators: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo { room, spectators } => run_demo(room, spectators).await,
    }
}

async fn run_demo(room: Option<String>, spectators: usize) -> Result<()> {
    let code = resolve_room_code(room)?;
    println!("{}", format!("📡 Room {code}").green().bold());

    let relay = LocalRelay::new();
    let registry = Arc::new(MemoryRegistry::new());

    let (alice_handle, mut alice_notices, alice_role) =
        spawn_party(&relay, &registry, &code, "alice").await?;
    println!("   alice joined as {}", role_label(alice_role));

    let (_bob_handle, mut bob_notices, bob_role) =
        spawn_party(&relay, &registry, &code, "bob").await?;
    println!("   bob joined as {}", role_label(bob_role));

    wait_stable(&mut alice_notices).await.context("alice never stabilized")?;
    wait_stable(&mut bob_notices).await.context("bob never stabilized")?;
    println!("{}", "✅ Primary negotiation stable on both sides".green());

    let invite = alice_handle.share_spectator_link().await?;
    println!("   spectator link: {}", invite.url.cyan());

    for n in 1..=spectators {
        attach_spectator(&relay, &code, n).await?;
        println!("   spectator {n} receiving");
    }

    alice_handle.end_call().await?;
    let room = registry
        .get_room(&code)
        .await?
        .context("room record missing")?;
    println!(
        "{}",
        format!("👋 Call ended, room active={}", room.is_active).yellow()
    );
    Ok(())
}

fn resolve_room_code(room: Option<String>) -> Result<RoomCode> {
    let raw = match room {
        Some(raw) => raw,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Room code (blank to generate)")
            .allow_empty(true)
            .interact_text()
            .context("room code prompt failed")?,
    };
    if raw.trim().is_empty() {
        return Ok(RoomCode::generate());
    }
    RoomCode::parse(&raw).context("invalid room code")
}

fn role_label(role: Role) -> ColoredString {
    match role {
        Role::Initiator => "initiator".cyan().bold(),
        Role::Responder => "responder".magenta(),
    }
}

async fn spawn_party(
    relay: &Arc<LocalRelay>,
    registry: &Arc<MemoryRegistry>,
    code: &RoomCode,
    name: &str,
) -> Result<(SessionHandle, broadcast::Receiver<SessionNotice>, Role)> {
    let endpoint = Arc::new(relay.endpoint(MemberKey(format!("user-{name}"))));
    let connector = Arc::new(LoopbackConnector::new());
    let (session, handle) = Session::join(
        code.clone(),
        endpoint,
        registry.clone(),
        connector,
        SessionConfig::default(),
    )
    .await
    .with_context(|| format!("{name} failed to join"))?;
    let role = session.assignment().role;
    let notices = handle.subscribe();
    tokio::spawn(session.run());
    Ok((handle, notices, role))
}

async fn wait_stable(notices: &mut broadcast::Receiver<SessionNotice>) -> Result<()> {
    let fut = async {
        loop {
            match notices.recv().await {
                Ok(SessionNotice::NegotiationStable) => return Ok(()),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("session gone"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .context("timed out waiting for stable negotiation")?
}

/// Viewer-side handshake against whichever party answers first: announce
/// readiness, take the tagged offer, reply with an answer.
async fn attach_spectator(relay: &Arc<LocalRelay>, code: &RoomCode, n: usize) -> Result<()> {
    let endpoint = relay.endpoint(MemberKey(format!("viewer-{n}")));
    let topic = room_topic(code);
    let mut events = endpoint.subscribe(&topic).await?;

    endpoint.broadcast(&topic, SignalEvent::SpectatorReady).await?;

    let fut = async {
        loop {
            match events.recv().await {
                Some(TransportEvent::Signal(SignalEvent::Offer {
                    participant_id: Some(id),
                    ..
                })) => return Ok(id),
                Some(_) => continue,
                None => bail!("relay closed"),
            }
        }
    };
    let participant_id = tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .context("no fan-out offer arrived")??;

    endpoint
        .broadcast(
            &topic,
            SignalEvent::SpectatorAnswer {
                answer: SessionDescription::answer(format!("v=0 viewer-{n}")),
                participant_id,
            },
        )
        .await?;
    Ok(())
}
