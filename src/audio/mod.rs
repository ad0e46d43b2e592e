//! Audio I/O for speaking and listening.
//!
//! Cross-platform capture and playback using cpal, with resampling via rubato
//! when the device rate differs from the model rate.

mod capture;
mod playback;
mod resampler;
mod util;

pub use capture::Capturer;
pub use playback::Player;
pub use util::input_device_available;
