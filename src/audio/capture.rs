//! Audio capture from the default input device.
//!
//! The cpal callback down-mixes to mono, resamples to the recognizer rate and
//! pushes into a lock-free ring buffer. A drain thread pops from the ring and
//! hands chunks to the user callback, so the audio thread never waits on VAD.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::Stream;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::StreamResampler;
use super::util::{device_name, find_best_config, to_mono};

/// Ring buffer capacity in samples (~4 seconds at 16kHz).
const CAPTURE_RING_SIZE: usize = 65536;

/// Largest chunk handed to the callback at once.
const DRAIN_CHUNK: usize = 2048;

/// Microphone capture for the duration of one recognition request.
pub struct Capturer {
    stream: Stream,
    shutdown: Arc<AtomicBool>,
    drain_handle: Option<JoinHandle<()>>,
}

impl Capturer {
    /// Open the default input device and start delivering samples at `sample_rate`.
    ///
    /// # Errors
    /// Returns an error if no input device is available or the stream cannot be started.
    pub fn start<F>(sample_rate: u32, mut callback: F) -> Result<Self>
    where
        F: FnMut(&[f32]) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_input_device().context("No input device available")?;

        info!("Using input device: {}", device_name(&device));

        let supported_configs = device.supported_input_configs().context("Failed to get supported input configs")?;
        let config = find_best_config(supported_configs, sample_rate)?;
        let device_sample_rate = config.sample_rate();
        let channels = config.channels() as usize;

        let mut resampler = if device_sample_rate != sample_rate {
            info!("Device sample rate {} Hz differs from target {} Hz - resampling will be applied", device_sample_rate, sample_rate);
            Some(StreamResampler::new(device_sample_rate, sample_rate)?)
        } else {
            None
        };

        let (mut producer, mut consumer) = HeapRb::<f32>::new(CAPTURE_RING_SIZE).split();

        let stream = device
            .build_input_stream(
                &config.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = to_mono(data, channels);
                    let samples = match resampler.as_mut() {
                        Some(resampler) => resampler.push(&mono),
                        None => mono,
                    };

                    let written = producer.push_slice(&samples);
                    if written < samples.len() {
                        warn!("Capture ring buffer full, dropped {} samples", samples.len() - written);
                    }
                },
                |err| tracing::error!("Audio capture error: {}", err),
                None,
            )
            .context("Failed to build input stream")?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let drain_shutdown = shutdown.clone();

        let drain_handle = std::thread::Builder::new()
            .name("capture-drain".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; DRAIN_CHUNK];
                while !drain_shutdown.load(Ordering::Relaxed) {
                    if consumer.is_empty() {
                        std::thread::sleep(Duration::from_millis(5));
                        continue;
                    }
                    let read = consumer.pop_slice(&mut buffer);
                    callback(&buffer[..read]);
                }
                debug!("Capture drain thread exiting");
            })
            .context("Failed to spawn capture drain thread")?;

        stream.play().context("Failed to start audio stream")?;
        debug!("Audio capture started: device {} Hz -> output {} Hz", device_sample_rate, sample_rate);

        Ok(Self { stream, shutdown, drain_handle: Some(drain_handle) })
    }

    /// Stop the stream and join the drain thread.
    pub fn stop(&mut self) {
        if let Err(e) = self.stream.pause() {
            debug!("Failed to pause input stream: {}", e);
        }
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = self.drain_handle.take()
            && handle.join().is_err()
        {
            warn!("Capture drain thread panicked");
        }
    }
}

impl Drop for Capturer {
    fn drop(&mut self) {
        self.stop();
    }
}
