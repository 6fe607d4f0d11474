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
use std::{fmt, sync::Arc, time::Duration};

use tracing::info;

use super::region::LoopRegion;
use crate::audio::{
    wav::{self, EncodeError},
    AudioBuffer,
};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid selection: the loop region holds no samples")]
    EmptySelection,
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A region encoded as 16-bit PCM WAV.
#[derive(Clone)]
pub struct EncodedClip {
    bytes: Arc<[u8]>,
    sample_rate: u32,
    channels: u16,
    frames: usize,
}

impl EncodedClip {
    /// The complete WAV file.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / f64::from(self.sample_rate))
    }
}

impl fmt::Debug for EncodedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedClip")
            .field("bytes", &self.bytes.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("frames", &self.frames)
            .finish()
    }
}

/// Copies the frames `[floor(start * len), floor(end * len))` of every channel and encodes
/// them. No resampling or channel mixing takes place.
pub fn extract(buffer: &AudioBuffer, region: &LoopRegion) -> Result<EncodedClip, ExtractError> {
    let (start, end) = region.frames(buffer.len());
    if end <= start {
        return Err(ExtractError::EmptySelection);
    }

    let slice = buffer.slice(start, end);
    let bytes = wav::encode_pcm16(&slice)?;
    info!(
        start_frame = start,
        end_frame = end,
        channels = slice.channel_count(),
        bytes = bytes.len(),
        "Extracted region"
    );

    Ok(EncodedClip {
        bytes: bytes.into(),
        sample_rate: slice.sample_rate(),
        channels: slice.channel_count(),
        frames: slice.len(),
    })
}
