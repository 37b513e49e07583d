//! The audio output ring buffer: a contiguous SPSC buffer with independent
//! read/write cursors, backed by `ringbuf` (`HeapRb`/`Producer`/`Consumer`/
//! `Split`, as in `playback.rs`/`capture.rs`).
//!
//! Overflow (producer outruns consumer) drops the newest samples and logs;
//! underflow (consumer outruns producer) emits silence and logs. Both are
//! ordinary operating conditions under network jitter, not errors the caller
//! needs to react to — they're surfaced through `tracing` and otherwise
//! shrugged off by the device callback.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use rgbd_protocol::constants::{CHANNELS, LATENCY_SEC, SAMPLE_RATE};
use tracing::warn;

/// Ring buffer capacity, in interleaved samples. Spec.md sizes the buffer as
/// `2 * latency_sec * bytes_per_second`; expressed in samples rather than
/// bytes that's twice `LATENCY_SEC` worth of stereo audio, giving the
/// producer headroom above the jitter buffer's own target delay.
pub fn capacity_samples() -> usize {
    2 * (LATENCY_SEC * SAMPLE_RATE as f32) as usize * CHANNELS
}

/// Producer half: pushes decoded PCM samples in, dropping and logging on
/// overflow rather than blocking the jitter-buffer drain loop.
pub struct RingProducer {
    inner: HeapProd<f32>,
}

impl RingProducer {
    pub fn push(&mut self, samples: &[f32]) {
        let pushed = self.inner.push_slice(samples);
        if pushed < samples.len() {
            let dropped = samples.len() - pushed;
            warn!(dropped, "audio ring buffer overflow");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Consumer half: pulls PCM samples out for playback, filling any shortfall
/// with silence and logging rather than returning a partial buffer.
pub struct RingConsumer {
    inner: HeapCons<f32>,
}

impl RingConsumer {
    pub fn pop_into(&mut self, out: &mut [f32]) {
        let read = self.inner.pop_slice(out);
        if read < out.len() {
            let silence = out.len() - read;
            warn!(silence, "audio ring buffer underflow");
            for sample in &mut out[read..] {
                *sample = 0.0;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }
}

/// Builds a fresh producer/consumer pair sized to [`capacity_samples`].
pub fn channel() -> (RingProducer, RingConsumer) {
    let rb = HeapRb::<f32>::new(capacity_samples());
    let (producer, consumer) = rb.split();
    (RingProducer { inner: producer }, RingConsumer { inner: consumer })
}
