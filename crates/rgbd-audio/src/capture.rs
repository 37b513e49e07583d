//! Microphone capture via a `cpal` input stream, generalized from a mono
//! device to the stereo `CHANNELS` this protocol's `Audio` packets carry.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use rgbd_protocol::constants::{CHANNELS, SAMPLE_RATE};
use tracing::{info, warn};

use crate::codec::{AudioEncoder, FRAME_LEN};
use crate::device;
use crate::error::AudioError;
use crate::ring::{self, RingConsumer, RingProducer};

pub struct CaptureStream {
    #[allow(dead_code)]
    stream: cpal::Stream,
    sample_rate: u32,
}

impl CaptureStream {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// Holds a `cpal::Stream` only to keep it alive; never touched from another
// thread.
unsafe impl Send for CaptureStream {}
unsafe impl Sync for CaptureStream {}

/// Starts capturing from `device_name` (or the host default), writing
/// interleaved stereo samples into a ring buffer the caller drains.
pub fn start_capture(device_name: Option<&str>) -> Result<(CaptureStream, RingConsumer), AudioError> {
    let device = device::get_input_device(device_name)?;
    let config = device.default_input_config().map_err(|e| AudioError::Device(e.to_string()))?;
    let device_channels = config.channels() as usize;
    let sample_format = config.sample_format();

    let fallback_rate = config.sample_rate().0;
    let stream_config = StreamConfig {
        channels: config.channels(),
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };
    if fallback_rate != SAMPLE_RATE {
        warn!(fallback_rate, target = SAMPLE_RATE, "capture device default rate differs, requesting override");
    }

    info!(
        device = device.name().unwrap_or_default(),
        channels = device_channels,
        "starting audio capture"
    );

    let (mut producer, consumer) = ring::channel();

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_as_stereo(&mut producer, data, device_channels);
                },
                |err| tracing::error!("audio capture error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Device(e.to_string()))?,
        format => return Err(AudioError::Device(format!("unsupported capture sample format: {format:?}"))),
    };

    stream.play().map_err(|e| AudioError::Device(e.to_string()))?;

    Ok((CaptureStream { stream, sample_rate: SAMPLE_RATE }, consumer))
}

/// Maps the device's native channel layout onto interleaved `CHANNELS`
/// (stereo) samples: passes stereo through, duplicates mono, and takes the
/// first two channels of anything wider.
fn push_as_stereo(producer: &mut RingProducer, data: &[f32], device_channels: usize) {
    match device_channels {
        CHANNELS => producer.push(data),
        1 => {
            let stereo: Vec<f32> = data.iter().flat_map(|&s| [s, s]).collect();
            producer.push(&stereo);
        }
        n if n > CHANNELS => {
            let stereo: Vec<f32> = data.chunks(n).flat_map(|c| [c[0], c[1]]).collect();
            producer.push(&stereo);
        }
        _ => {}
    }
}

/// Pulls whole frames of captured PCM and Opus-encodes them, tagging each
/// with a monotonically increasing `frame_id` — the sender-side half of
/// the audio pipeline.
pub struct AudioSenderPipeline {
    consumer: RingConsumer,
    encoder: AudioEncoder,
    next_frame_id: i32,
}

impl AudioSenderPipeline {
    pub fn new(consumer: RingConsumer, bitrate_bps: i32) -> Result<Self, AudioError> {
        Ok(Self { consumer, encoder: AudioEncoder::with_bitrate(bitrate_bps)?, next_frame_id: 0 })
    }

    /// Encodes and returns the next ready frame, or `None` if less than one
    /// full frame of captured audio is buffered yet.
    pub fn try_next_packet(&mut self) -> Result<Option<rgbd_protocol::audio::AudioSenderPacket>, AudioError> {
        if self.consumer.len() < FRAME_LEN {
            return Ok(None);
        }
        let mut pcm = vec![0.0f32; FRAME_LEN];
        self.consumer.pop_into(&mut pcm);
        let opus_payload = self.encoder.encode(&pcm)?;
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        Ok(Some(rgbd_protocol::audio::AudioSenderPacket { frame_id, opus_payload }))
    }
}
