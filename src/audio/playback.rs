//! Audio playback through the default output device.
//!
//! Samples are queued into a lock-free ring buffer drained by the cpal callback.
//! A shared halt flag silences the callback and aborts a blocking `play`, which
//! is how flushed utterances are cut short.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::resample;
use super::util::{device_name, find_best_config};

/// Ring buffer capacity in samples (~11 seconds at 48kHz).
const PLAYBACK_RING_SIZE: usize = 524288;

/// How often a blocking `play` re-checks the halt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Audio player that outputs mono samples to the speaker.
pub struct Player {
    _stream: Stream,                         // Kept alive to maintain the audio stream
    device_sample_rate: u32,                 // Rate the device runs at
    input_sample_rate: u32,                  // Rate of the samples handed to `play`
    producer: Mutex<ringbuf::HeapProd<f32>>, // Feeds the callback
    halt: Arc<AtomicBool>,                   // Set by the owner to cut playback
}

impl Player {
    /// Open the default output device.
    ///
    /// # Arguments
    /// * `sample_rate` - Rate of the samples that will be played (24kHz for Kokoro)
    /// * `halt` - Flag that interrupts playback while set
    ///
    /// # Errors
    /// Returns an error if no output device is available or the stream cannot be built.
    pub fn new(sample_rate: u32, halt: Arc<AtomicBool>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().context("No output device available")?;

        info!("Using output device: {}", device_name(&device));

        let preferred_rate = device.default_output_config().map(|c| c.sample_rate()).unwrap_or(48000);
        let supported_configs = device.supported_output_configs().context("Failed to get supported output configs")?;
        let config = find_best_config(supported_configs, preferred_rate)?;
        let device_sample_rate = config.sample_rate();

        if device_sample_rate != sample_rate {
            info!("Device sample rate {} Hz differs from input {} Hz - resampling will be applied", device_sample_rate, sample_rate);
        }

        let (producer, mut consumer) = HeapRb::<f32>::new(PLAYBACK_RING_SIZE).split();

        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();
        let halt_cb = halt.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let halted = halt_cb.load(Ordering::Relaxed);
                    if halted {
                        // Discard whatever is queued
                        consumer.clear();
                    }

                    for frame in data.chunks_mut(channels) {
                        let sample = if halted { 0.0 } else { consumer.try_pop().unwrap_or(0.0) };
                        frame.fill(sample);
                    }
                },
                |err| tracing::error!("Audio playback error: {}", err),
                None,
            )
            .context("Failed to build output stream")?;

        stream.play().context("Failed to start playback stream")?;

        info!("Audio playback configured: input {} Hz -> device {} Hz", sample_rate, device_sample_rate);

        Ok(Self { _stream: stream, device_sample_rate, input_sample_rate: sample_rate, producer: Mutex::new(producer), halt })
    }

    /// Play samples, blocking until they are drained or playback is halted.
    ///
    /// # Returns
    /// `true` if playback completed, `false` if halted or timed out.
    pub fn play(&self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return true;
        }

        let samples = match resample(samples, self.input_sample_rate, self.device_sample_rate) {
            Ok(resampled) => resampled,
            Err(e) => {
                warn!("Resampling failed: {:#}, playing without resampling", e);
                samples.to_vec()
            }
        };

        {
            let mut producer = self.producer.lock();
            let written = producer.push_slice(&samples);
            if written < samples.len() {
                warn!("Playback buffer overflow, dropped {} samples", samples.len() - written);
            }
        }

        debug!("Playing {} samples at {} Hz", samples.len(), self.device_sample_rate);

        let duration = Duration::from_secs_f64(samples.len() as f64 / self.device_sample_rate as f64);
        let deadline = Instant::now() + duration + Duration::from_secs(1);

        wait_until_drained(|| self.producer.lock().occupied_len(), &self.halt, deadline)
    }
}

/// Block until `pending` reports an empty ring.
///
/// Returns `false` if `halt` is raised or `deadline` passes first.
fn wait_until_drained(pending: impl Fn() -> usize, halt: &AtomicBool, deadline: Instant) -> bool {
    while pending() > 0 {
        if halt.load(Ordering::SeqCst) {
            debug!("Playback halted");
            return false;
        }
        if Instant::now() > deadline {
            warn!("Playback timeout exceeded");
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    !halt.load(Ordering::SeqCst)
}
