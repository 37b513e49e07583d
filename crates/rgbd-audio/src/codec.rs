//! Stereo Opus encode/decode over `SAMPLES_PER_FRAME`-sample frames,
//! matching the stereo capture device this audio path carries end to end.

use audiopus::coder::{Decoder as OpusDecoderInner, Encoder as OpusEncoderInner};
use audiopus::packet::Packet;
use audiopus::{Application, Bitrate, Channels, MutSignals, SampleRate, Signal};
use rgbd_protocol::constants::SAMPLES_PER_FRAME;

use crate::error::AudioError;

/// Interleaved stereo samples per encoded/decoded frame
/// (`SAMPLES_PER_FRAME` per channel).
pub const FRAME_LEN: usize = SAMPLES_PER_FRAME * 2;

/// Encodes one interleaved-stereo PCM frame into an Opus packet.
pub struct AudioEncoder {
    inner: OpusEncoderInner,
}

/// Default Opus target bitrate, overridable via `SenderSettings`.
pub const DEFAULT_BITRATE_BPS: i32 = 64_000;

impl AudioEncoder {
    pub fn new() -> Result<Self, AudioError> {
        Self::with_bitrate(DEFAULT_BITRATE_BPS)
    }

    pub fn with_bitrate(bitrate_bps: i32) -> Result<Self, AudioError> {
        let mut encoder = OpusEncoderInner::new(SampleRate::Hz48000, Channels::Stereo, Application::Voip)
            .map_err(AudioError::Encode)?;
        encoder.set_bitrate(Bitrate::BitsPerSecond(bitrate_bps)).map_err(AudioError::Encode)?;
        encoder.set_inband_fec(true).map_err(AudioError::Encode)?;
        encoder.set_packet_loss_perc(15).map_err(AudioError::Encode)?;
        encoder.set_signal(Signal::Voice).map_err(AudioError::Encode)?;
        Ok(Self { inner: encoder })
    }

    /// `pcm` must hold exactly [`FRAME_LEN`] interleaved stereo samples.
    pub fn encode(&mut self, pcm: &[f32]) -> Result<Vec<u8>, AudioError> {
        debug_assert_eq!(pcm.len(), FRAME_LEN);
        let mut output = vec![0u8; 512];
        let len = self.inner.encode_float(pcm, &mut output).map_err(AudioError::Encode)?;
        output.truncate(len);
        Ok(output)
    }
}

/// Decodes Opus packets back into interleaved-stereo PCM, with packet-loss
/// concealment for gaps the jitter buffer reports.
pub struct AudioDecoder {
    inner: OpusDecoderInner,
}

impl AudioDecoder {
    pub fn new() -> Result<Self, AudioError> {
        let decoder = OpusDecoderInner::new(SampleRate::Hz48000, Channels::Stereo).map_err(AudioError::Decode)?;
        Ok(Self { inner: decoder })
    }

    /// Decodes one frame. `opus_data` is `None` for a lost packet, in which
    /// case Opus itself generates the interpolated/comfort-noise
    /// concealment samples via the `decode_float(None, ..)` path.
    pub fn decode(&mut self, opus_data: Option<&[u8]>) -> Result<Vec<f32>, AudioError> {
        let mut output = vec![0.0f32; FRAME_LEN];
        let packet = opus_data.map(Packet::try_from).transpose().map_err(AudioError::Decode)?;
        let signals = MutSignals::try_from(&mut output).map_err(AudioError::Decode)?;
        let samples = self.inner.decode_float(packet, signals, false).map_err(AudioError::Decode)?;
        output.truncate(samples * 2);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips_to_expected_frame_length() {
        let mut encoder = AudioEncoder::new().unwrap();
        let mut decoder = AudioDecoder::new().unwrap();
        let pcm: Vec<f32> = (0..FRAME_LEN).map(|i| ((i % 100) as f32 / 100.0) - 0.5).collect();

        let encoded = encoder.encode(&pcm).unwrap();
        let decoded = decoder.decode(Some(&encoded)).unwrap();

        assert_eq!(decoded.len(), FRAME_LEN);
    }

    #[test]
    fn lost_packet_produces_concealment_samples_of_the_right_length() {
        let mut decoder = AudioDecoder::new().unwrap();
        let concealed = decoder.decode(None).unwrap();
        assert_eq!(concealed.len(), FRAME_LEN);
    }
}
