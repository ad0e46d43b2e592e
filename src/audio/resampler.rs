//! Mono resampling with rubato's FFT resampler.
//!
//! `StreamResampler` carries state across capture callbacks; `resample` converts
//! a whole synthesized utterance before playback.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Input frames per FFT pass.
const CHUNK_SIZE: usize = 1024;

/// Sub-chunks per FFT pass (higher = better quality, more CPU).
const SUB_CHUNKS: usize = 2;

fn new_fft(from_rate: u32, to_rate: u32) -> Result<Fft<f32>> {
    Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input).context("Failed to create resampler")
}

/// Resample one full chunk of `CHUNK_SIZE` input frames into `output`, returning the frames written.
fn process_chunk(resampler: &mut Fft<f32>, chunk: &[f32], output: &mut [f32]) -> Result<usize> {
    let output_frames = output.len();
    let input_adapter = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).context("Failed to create input adapter")?;
    let mut output_adapter = InterleavedSlice::new_mut(output, 1, output_frames).context("Failed to create output adapter")?;
    let (_, frames_written) =
        resampler.process_into_buffer(&input_adapter, &mut output_adapter, None).map_err(|e| anyhow::anyhow!("Resampling error: {}", e))?;
    Ok(frames_written)
}

/// Streaming resampler for capture callbacks, which deliver arbitrary slice sizes.
pub struct StreamResampler {
    resampler: Fft<f32>,
    pending: Vec<f32>, // Input accumulated until a full chunk is available
    output: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let resampler = new_fft(from_rate, to_rate)?;
        let output = vec![0.0f32; resampler.output_frames_max()];
        Ok(Self { resampler, pending: Vec::with_capacity(CHUNK_SIZE * 2), output })
    }

    /// Feed samples; returns whatever full chunks produced (possibly nothing).
    pub fn push(&mut self, samples: &[f32]) -> Vec<f32> {
        self.pending.extend_from_slice(samples);

        let mut resampled = Vec::new();
        while self.pending.len() >= CHUNK_SIZE {
            let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
            match process_chunk(&mut self.resampler, &chunk, &mut self.output) {
                Ok(frames) => resampled.extend_from_slice(&self.output[..frames]),
                Err(e) => tracing::warn!("Dropping capture chunk: {:#}", e),
            }
        }
        resampled
    }
}

/// Resample a whole buffer from `from_rate` to `to_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = new_fft(from_rate, to_rate)?;
    let mut output_buffer = vec![0.0f32; resampler.output_frames_max()];
    let expected_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut output = Vec::with_capacity(expected_len + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        // Zero-pad the final partial chunk
        let mut input = chunk.to_vec();
        input.resize(CHUNK_SIZE, 0.0);

        let frames = process_chunk(&mut resampler, &input, &mut output_buffer)?;
        output.extend_from_slice(&output_buffer[..frames]);
    }

    // Drop padding beyond a small margin
    output.truncate(expected_len + 100);
    Ok(output)
}
