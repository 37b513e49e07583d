//! Speaker playback via a `cpal` output stream. The jitter-buffer drain loop
//! feeds decoded PCM into the producer this module returns; the cpal output
//! callback pulls from the matching consumer on its own thread.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use rgbd_protocol::constants::{CHANNELS, SAMPLE_RATE};
use tracing::info;

use crate::device;
use crate::error::AudioError;
use crate::ring::{self, RingProducer};

pub struct PlaybackStream {
    #[allow(dead_code)]
    stream: cpal::Stream,
    sample_rate: u32,
}

impl PlaybackStream {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

unsafe impl Send for PlaybackStream {}
unsafe impl Sync for PlaybackStream {}

/// Starts playback on `device_name` (or the host default) and returns a
/// producer the caller feeds decoded stereo PCM into.
pub fn start_playback(device_name: Option<&str>) -> Result<(PlaybackStream, RingProducer), AudioError> {
    let device = device::get_output_device(device_name)?;
    let config = device.default_output_config().map_err(|e| AudioError::Device(e.to_string()))?;
    let device_channels = config.channels() as usize;
    let sample_format = config.sample_format();

    let stream_config = StreamConfig {
        channels: config.channels(),
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        device = device.name().unwrap_or_default(),
        channels = device_channels,
        "starting audio playback"
    );

    let (producer, mut consumer) = ring::channel();

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if device_channels == CHANNELS {
                        consumer.pop_into(data);
                    } else {
                        let mut stereo = vec![0.0f32; (data.len() / device_channels) * CHANNELS];
                        consumer.pop_into(&mut stereo);
                        for (frame, stereo_frame) in data.chunks_mut(device_channels).zip(stereo.chunks(CHANNELS)) {
                            for (i, sample) in frame.iter_mut().enumerate() {
                                *sample = stereo_frame[i % CHANNELS];
                            }
                        }
                    }
                },
                |err| tracing::error!("audio playback error: {}", err),
                None,
            )
            .map_err(|e| AudioError::Device(e.to_string()))?,
        format => return Err(AudioError::Device(format!("unsupported playback sample format: {format:?}"))),
    };

    stream.play().map_err(|e| AudioError::Device(e.to_string()))?;

    Ok((PlaybackStream { stream, sample_rate: SAMPLE_RATE }, producer))
}

/// Drives the receive-side audio pipeline: drains the jitter buffer through
/// the decoder and pushes resulting PCM into the playback ring buffer.
pub struct AudioReceiverPipeline {
    jitter: crate::jitter::AudioJitterBuffer,
    decoder: crate::codec::AudioDecoder,
    producer: RingProducer,
    /// Linear gain applied to every decoded sample before playback.
    /// Configuration, not a protocol invariant.
    amplifier_gain: f32,
}

impl AudioReceiverPipeline {
    pub fn new(target_delay: usize, producer: RingProducer, amplifier_gain: f32) -> Result<Self, AudioError> {
        Ok(Self {
            jitter: crate::jitter::AudioJitterBuffer::new(target_delay),
            decoder: crate::codec::AudioDecoder::new()?,
            producer,
            amplifier_gain,
        })
    }

    pub fn push(&mut self, packet: rgbd_protocol::audio::AudioSenderPacket) {
        self.jitter.push(packet);
    }

    /// Drops all buffered frames and re-enters the initial buffering state,
    /// for use when the session that fed this pipeline has ended.
    pub fn reset(&mut self) {
        self.jitter.reset();
    }

    /// Drains every frame currently ready and forwards it to playback.
    /// Returns the number of frames drained.
    pub fn tick(&mut self) -> Result<usize, AudioError> {
        let mut drained = 0;
        while let Some(mut pcm) = self.jitter.drain(&mut self.decoder)? {
            if self.amplifier_gain != 1.0 {
                for sample in &mut pcm {
                    *sample *= self.amplifier_gain;
                }
            }
            self.producer.push(&pcm);
            drained += 1;
        }
        Ok(drained)
    }
}
