// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, fmt, sync::Arc};

use crate::config;

pub mod buffer;
pub mod cpal;
pub mod handle;
pub mod mixer;
pub mod mock;
pub mod transport;
pub mod wav;

pub use buffer::{decode, AudioBuffer, DecodeError};
pub use handle::{PlayRequest, PlaybackEnd, PlaybackHandle};
pub use transport::{Owner, Transport};

/// Errors raised when the audio engine is asked to start a sound.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The output refused to start audio. Retrying after the next user gesture is fine.
    #[error("Playback rejected: {0}")]
    Rejected(String),
    /// The requested range does not contain any audio.
    #[error("Invalid region: end {end:.6} is not after start {start:.6}")]
    InvalidRegion { start: f64, end: f64 },
    /// The sound assigned to a pad could not be opened.
    #[error("Could not play {0}")]
    NoSource(String),
}

/// An output that plays decoded buffers.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Starts a new voice. The returned handle is the only way to stop it.
    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, PlaybackError>;

    /// Stops the given voice. The voice is silent from the next rendered block.
    fn stop(&self, handle: &PlaybackHandle) {
        handle.stop();
    }

    /// The rate the device renders at.
    fn sample_rate(&self) -> u32;

    /// Whether the output has failed. Voices on a failed output never end on their own.
    fn is_failed(&self) -> bool {
        false
    }
}

/// Describes an output device found on the system.
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the device described by the given configuration. Names starting with "mock"
/// select the in-process mock device.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::realtime(device, config.sample_rate())));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
