//! Shared audio utilities for capture and playback.

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

/// Human-readable device name, or "Unknown".
pub fn device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Whether the default host exposes a microphone.
pub fn input_device_available() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// Pick a mono/stereo F32 configuration, at `target_sample_rate` when supported
/// or at the closest rate the first usable configuration offers.
pub fn find_best_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_sample_rate: u32) -> Result<SupportedStreamConfig> {
    let f32_configs: Vec<SupportedStreamConfigRange> =
        configs.filter(|config| config.channels() <= 2 && config.sample_format() == SampleFormat::F32).collect();

    if f32_configs.is_empty() {
        anyhow::bail!("No mono/stereo F32 audio configuration found");
    }

    if let Some(config) = f32_configs.iter().find(|c| (c.min_sample_rate()..=c.max_sample_rate()).contains(&target_sample_rate)) {
        return Ok(config.clone().with_sample_rate(target_sample_rate));
    }

    let config = &f32_configs[0];
    Ok(config.clone().with_sample_rate(closest_rate(config.min_sample_rate(), config.max_sample_rate(), target_sample_rate)))
}

/// Clamp `target` into `[min, max]`.
fn closest_rate(min: u32, max: u32, target: u32) -> u32 {
    target.clamp(min, max)
}

/// Down-mix interleaved frames to mono by averaging channels.
pub fn to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        data.to_vec()
    } else {
        data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
    }
}
