//! The capture host: captures RGB-D (+ stereo audio), fragments and
//! FEC-protects each frame, and streams it to every connected receiver over
//! UDP, adapting bitrate and keyframe cadence to the slowest reporting
//! receiver.
//!
//! Wires config, settings, tracing and the socket together into a single
//! `tokio::select!` loop driving a single-socket UDP sender.

mod config;
mod demo;
mod settings;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use rgbd_audio::capture::AudioSenderPipeline;
use rgbd_protocol::video::VideoSenderMessage;
use rgbd_protocol::{ReceiverPacket, SenderPacket};
use rgbd_transport::collaborators::{Capture, VideoCodec};
use rgbd_transport::sender::{bitrate, registry::ReceiverRegistry, router, storage::SenderStorage};
use rgbd_transport::socket::Endpoint;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use config::SenderConfig;
use demo::{DemoCapture, PassthroughCodec};
use settings::SenderSettings;

#[derive(Parser)]
#[command(name = "rgbd-sender", about = "RGB-D + stereo audio streaming sender")]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Disable microphone capture even if a settings file enables it.
    #[arg(long)]
    no_audio: bool,
}

/// Sends one datagram to a known receiver's endpoint. On a terminal socket
/// error, logs the `TransportError::EndpointUnreachable` `Endpoint::send`
/// reports and returns the receiver id so the caller can evict that entry
/// (spec.md §4.3/§7: "a terminal send error naming an endpoint" removes the
/// matching registry entry).
async fn send_to_receiver(endpoint: &Endpoint, bytes: &[u8], receiver_id: i32, to: SocketAddr) -> Option<i32> {
    match endpoint.send(bytes, to).await {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, receiver_id, "evicting receiver after send failure");
            Some(receiver_id)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "rgbd_sender=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
        toml::from_str(&content)?
    } else {
        SenderConfig::default()
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let mut settings = if let Some(path) = &args.settings {
        SenderSettings::load_from_file(path).with_context(|| format!("loading settings file {path:?}"))?
    } else {
        SenderSettings::default()
    };
    if args.no_audio {
        settings.audio_enabled = false;
    }

    let owner_id: i32 = rand::thread_rng().gen();
    let bind_addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!(owner_id, %bind_addr, audio_enabled = settings.audio_enabled, "starting sender");

    let endpoint = Endpoint::bind(bind_addr).with_context(|| format!("binding UDP socket on {bind_addr}"))?;

    let mut registry = ReceiverRegistry::new();
    let mut storage = SenderStorage::new();
    let mut capture = DemoCapture::new();
    let mut codec = PassthroughCodec;

    let mut audio_pipeline: Option<AudioSenderPipeline> = None;
    // Held for the process lifetime: dropping it would stop the capture stream.
    let _capture_stream = if settings.audio_enabled {
        match rgbd_audio::start_capture(None) {
            Ok((stream, consumer)) => {
                audio_pipeline = AudioSenderPipeline::new(consumer, settings.audio_bitrate_bps).ok();
                Some(stream)
            }
            Err(e) => {
                warn!(error = %e, "no audio capture device available, streaming video only");
                None
            }
        }
    } else {
        None
    };

    let mut next_frame_id: i32 = 0;
    let mut last_frame_time = Instant::now();

    let mut capture_ticker = interval(Duration::from_secs_f32(1.0 / config.capture_rate_hz));
    let mut heartbeat_ticker = interval(Duration::from_secs_f32(rgbd_protocol::constants::HEARTBEAT_INTERVAL_SEC));
    let mut cleanup_ticker = interval(Duration::from_secs_f32(1.0));
    let mut audio_ticker = interval(Duration::from_millis(5));

    let mut recv_buf = vec![0u8; rgbd_protocol::constants::PACKET_SIZE];

    loop {
        tokio::select! {
            result = endpoint.receive(&mut recv_buf) => {
                let (bytes, from) = match result {
                    Ok(Some(v)) => v,
                    Ok(None) => continue,
                    Err(e) => { warn!(error = %e, "recv failed"); continue; }
                };
                match ReceiverPacket::parse(&bytes) {
                    Ok(packet) => {
                        let receiver_id = packet.owner_id();
                        let replies = router::handle(owner_id, &packet, from, &mut registry, &storage, Instant::now());
                        for reply in replies {
                            if let Some(id) = send_to_receiver(&endpoint, &reply.to_bytes(), receiver_id, from).await {
                                registry.remove(id);
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, %from, "malformed receiver packet"),
                }
            }

            _ = capture_ticker.tick() => {
                let now = Instant::now();
                let decision = bitrate::plan_capture(&registry, next_frame_id.max(0) - 1, last_frame_time, now);
                if decision.is_ready {
                    if let Some(frame) = capture.capture() {
                        let frame_id = next_frame_id;
                        next_frame_id += 1;
                        last_frame_time = now;

                        let (color, depth) = codec.encode(&frame.color, &frame.depth, decision.keyframe);
                        let message = VideoSenderMessage {
                            frame_time_stamp: now.elapsed().as_secs_f32(),
                            keyframe: decision.keyframe,
                            width: frame.width,
                            height: frame.height,
                            intrinsics: frame.intrinsics,
                            color_bytes: color,
                            depth_bytes: depth,
                            floor: frame.floor,
                        };
                        let encoded = message.encode();
                        match rgbd_protocol::video::split(frame_id, &encoded) {
                            Ok(video_packets) => {
                                let parity_packets = rgbd_protocol::video::build_parity(frame_id, &video_packets);
                                storage.insert(frame_id, video_packets.clone(), parity_packets.clone());

                                let targets: Vec<(i32, SocketAddr)> = registry
                                    .iter()
                                    .filter(|e| e.video_requested)
                                    .map(|e| (e.receiver_id, e.endpoint))
                                    .collect();
                                let mut unreachable = Vec::new();
                                for (receiver_id, to) in targets {
                                    let mut failed = false;
                                    for p in &video_packets {
                                        let pkt = SenderPacket::Video { owner_id, body: p.clone() };
                                        if send_to_receiver(&endpoint, &pkt.to_bytes(), receiver_id, to).await.is_some() {
                                            failed = true;
                                            break;
                                        }
                                    }
                                    if !failed {
                                        for p in &parity_packets {
                                            let pkt = SenderPacket::Parity { owner_id, body: p.clone() };
                                            if send_to_receiver(&endpoint, &pkt.to_bytes(), receiver_id, to).await.is_some() {
                                                failed = true;
                                                break;
                                            }
                                        }
                                    }
                                    if failed {
                                        unreachable.push(receiver_id);
                                    }
                                }
                                for id in unreachable {
                                    registry.remove(id);
                                }
                            }
                            Err(e) => warn!(error = %e, frame_id, "failed to fragment video message"),
                        }
                    }
                }
            }

            _ = audio_ticker.tick(), if audio_pipeline.is_some() => {
                if let Some(pipeline) = audio_pipeline.as_mut() {
                    while let Ok(Some(packet)) = pipeline.try_next_packet() {
                        let pkt = SenderPacket::Audio { owner_id, body: packet };
                        let bytes = pkt.to_bytes();
                        let targets: Vec<(i32, SocketAddr)> = registry
                            .iter()
                            .filter(|e| e.audio_requested)
                            .map(|e| (e.receiver_id, e.endpoint))
                            .collect();
                        for (receiver_id, to) in targets {
                            if let Some(id) = send_to_receiver(&endpoint, &bytes, receiver_id, to).await {
                                registry.remove(id);
                            }
                        }
                    }
                }
            }

            _ = heartbeat_ticker.tick() => {
                let pkt = SenderPacket::Heartbeat { owner_id };
                let bytes = pkt.to_bytes();
                let targets: Vec<(i32, SocketAddr)> = registry.iter().map(|e| (e.receiver_id, e.endpoint)).collect();
                for (receiver_id, to) in targets {
                    if let Some(id) = send_to_receiver(&endpoint, &bytes, receiver_id, to).await {
                        registry.remove(id);
                    }
                }
            }

            _ = cleanup_ticker.tick() => {
                let now = Instant::now();
                let evicted = registry.evict_timed_out(now);
                for id in evicted {
                    info!(receiver_id = id, "evicted timed-out receiver");
                }
                if let Some(min_reported) = registry.min_reported_frame_id() {
                    storage.cleanup(min_reported);
                }
            }
        }
    }
}

