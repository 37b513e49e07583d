//! The rendering host: connects to a sender, reassembles FEC-protected
//! video frames and jittered audio, and drives presentation/playback.
//!
//! Wires config, settings, tracing and the socket together into a single
//! `tokio::select!` loop driving a single-socket UDP receiver.

mod config;
mod demo;
mod settings;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use rgbd_audio::playback::AudioReceiverPipeline;
use rgbd_protocol::control::{ConnectPacket, ReportPacket};
use rgbd_protocol::{ReceiverPacket, SenderPacket};
use rgbd_transport::receiver::{plan_requests, RenderDispatcher};
use rgbd_transport::socket::Endpoint;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use config::ReceiverConfig;
use demo::{DemoPresentation, PassthroughCodec};
use settings::ReceiverSettings;

#[derive(Parser)]
#[command(name = "rgbd-receiver", about = "RGB-D + stereo audio streaming receiver")]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    sender_host: Option<String>,

    #[arg(long)]
    sender_port: Option<u16>,

    /// Decline the audio stream even if the config file requests it.
    #[arg(long)]
    no_audio: bool,
}

/// Drops all in-flight session state and re-announces `Connect`, for use
/// whenever the sender becomes unreachable (a heartbeat timeout or a hard
/// socket receive failure). With no interactive shell to return to (out of
/// scope, spec.md §1), "ending the session" per spec.md §4.3/§7 means this:
/// reset and let rendering resume cleanly if the sender comes back.
async fn end_session(
    endpoint: &Endpoint,
    sender_addr: SocketAddr,
    owner_id: i32,
    config: &ReceiverConfig,
    sender_confirmed: &mut bool,
    storage: &mut rgbd_transport::receiver::ReceiverStorage,
    dispatcher: &mut RenderDispatcher,
    audio_pipeline: &mut Option<AudioReceiverPipeline>,
) {
    *sender_confirmed = false;
    *storage = rgbd_transport::receiver::ReceiverStorage::new();
    *dispatcher = RenderDispatcher::new();
    if let Some(pipeline) = audio_pipeline.as_mut() {
        pipeline.reset();
    }
    let connect = ReceiverPacket::Connect {
        owner_id,
        body: ConnectPacket { video_requested: config.video_requested, audio_requested: config.audio_requested },
    };
    let _ = endpoint.send(&connect.to_bytes(), sender_addr).await;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "rgbd_receiver=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
        toml::from_str(&content)?
    } else {
        ReceiverConfig::default()
    };
    if let Some(host) = args.sender_host {
        config.sender_host = host;
    }
    if let Some(port) = args.sender_port {
        config.sender_port = port;
    }
    if args.no_audio {
        config.audio_requested = false;
    }

    let mut settings = if let Some(path) = &args.settings {
        ReceiverSettings::load_from_file(path).with_context(|| format!("loading settings file {path:?}"))?
    } else {
        ReceiverSettings::default()
    };
    if let Some(audio_enabled) = settings.audio_enabled {
        config.audio_requested &= audio_enabled;
    }

    let owner_id: i32 = rand::thread_rng().gen();
    let sender_addr: SocketAddr = format!("{}:{}", config.sender_host, config.sender_port).parse()?;
    let bind_addr: SocketAddr = "0.0.0.0:0".parse()?;

    info!(owner_id, %sender_addr, video = config.video_requested, audio = config.audio_requested, "starting receiver");

    let endpoint = Endpoint::bind(bind_addr).with_context(|| "binding UDP socket")?;

    let connect = ReceiverPacket::Connect {
        owner_id,
        body: ConnectPacket { video_requested: config.video_requested, audio_requested: config.audio_requested },
    };
    endpoint.send(&connect.to_bytes(), sender_addr).await.with_context(|| "sending initial connect packet")?;

    let mut storage = rgbd_transport::receiver::ReceiverStorage::new();
    let mut dispatcher = RenderDispatcher::new();
    let mut codec = PassthroughCodec;
    let mut presentation = DemoPresentation::new();

    let mut audio_pipeline: Option<AudioReceiverPipeline> = None;
    let _playback_stream = if config.audio_requested {
        match rgbd_audio::start_playback(None) {
            Ok((stream, producer)) => {
                audio_pipeline = AudioReceiverPipeline::new(
                    settings.jitter_target_delay_frames,
                    producer,
                    settings.audio_amplifier_gain,
                )
                .ok();
                Some(stream)
            }
            Err(e) => {
                warn!(error = %e, "no audio playback device available, receiving video only");
                None
            }
        }
    } else {
        None
    };

    let mut sender_confirmed = false;
    let mut last_sender_activity = Instant::now();

    let mut request_ticker = interval(Duration::from_millis(settings.request_planner_interval_ms));
    let mut render_ticker = interval(Duration::from_millis(33));
    let mut heartbeat_ticker = interval(Duration::from_secs_f32(rgbd_protocol::constants::HEARTBEAT_INTERVAL_SEC));
    let mut audio_ticker = interval(Duration::from_millis(5));
    let mut liveness_ticker = interval(Duration::from_secs_f32(1.0));

    let mut recv_buf = vec![0u8; rgbd_protocol::constants::PACKET_SIZE];

    loop {
        tokio::select! {
            result = endpoint.receive(&mut recv_buf) => {
                let (bytes, from) = match result {
                    Ok(Some(v)) => v,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "recv failed, ending session");
                        end_session(&endpoint, sender_addr, owner_id, &config, &mut sender_confirmed, &mut storage, &mut dispatcher, &mut audio_pipeline).await;
                        continue;
                    }
                };
                if from != sender_addr {
                    continue;
                }
                last_sender_activity = Instant::now();
                match SenderPacket::parse(&bytes) {
                    Ok(SenderPacket::Confirm { body, .. }) => {
                        if !sender_confirmed {
                            info!(receiver_id = body.receiver_id, "connection confirmed");
                            sender_confirmed = true;
                        }
                    }
                    Ok(SenderPacket::Heartbeat { .. }) => {}
                    Ok(SenderPacket::Video { body, .. }) => storage.add_video_packet(body),
                    Ok(SenderPacket::Parity { body, .. }) => storage.add_parity_packet(body),
                    Ok(SenderPacket::Audio { body, .. }) => {
                        if let Some(pipeline) = audio_pipeline.as_mut() {
                            pipeline.push(body);
                        }
                    }
                    Err(e) => warn!(error = %e, "malformed sender packet"),
                }
            }

            _ = request_ticker.tick(), if sender_confirmed && config.video_requested => {
                for request in plan_requests(&storage, dispatcher.last_rendered_frame_id()) {
                    let pkt = ReceiverPacket::Request { owner_id, body: request };
                    if let Err(e) = endpoint.send(&pkt.to_bytes(), sender_addr).await {
                        warn!(error = %e, "failed to send request packet");
                    }
                }
            }

            _ = render_ticker.tick(), if config.video_requested => {
                // spec.md §4.7: report the newly rendered frame immediately,
                // not on an independent timer — only when this tick actually
                // advanced the render cursor.
                let before = dispatcher.last_rendered_frame_id();
                dispatcher.tick(&mut storage, &mut codec, &mut presentation);
                let after = dispatcher.last_rendered_frame_id();
                if sender_confirmed && after != before {
                    if let Some(frame_id) = after {
                        let pkt = ReceiverPacket::Report { owner_id, body: ReportPacket { frame_id } };
                        let _ = endpoint.send(&pkt.to_bytes(), sender_addr).await;
                    }
                }
            }

            _ = heartbeat_ticker.tick() => {
                let pkt = ReceiverPacket::Heartbeat { owner_id };
                let _ = endpoint.send(&pkt.to_bytes(), sender_addr).await;
            }

            _ = audio_ticker.tick(), if audio_pipeline.is_some() => {
                if let Some(pipeline) = audio_pipeline.as_mut() {
                    if let Err(e) = pipeline.tick() {
                        warn!(error = %e, "audio playback pipeline error");
                    }
                }
            }

            _ = liveness_ticker.tick() => {
                let elapsed = last_sender_activity.elapsed().as_secs_f32();
                if sender_confirmed && elapsed > rgbd_protocol::constants::RECEIVER_HEARTBEAT_TIMEOUT_SEC {
                    warn!(elapsed, "sender timed out, ending session");
                    end_session(&endpoint, sender_addr, owner_id, &config, &mut sender_confirmed, &mut storage, &mut dispatcher, &mut audio_pipeline).await;
                }
            }
        }
    }
}
