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
use std::{fmt, io::Cursor, time::Duration};

use hound::{SampleFormat, WavReader};
use tracing::info;

/// Errors raised while decoding an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupt audio: {0}")]
    Corrupt(String),
}

impl From<hound::Error> for DecodeError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::Unsupported => {
                DecodeError::UnsupportedFormat("WAV encoding is not PCM or IEEE float".into())
            }
            hound::Error::FormatError(msg) => DecodeError::Corrupt(msg.into()),
            err => DecodeError::Corrupt(err.to_string()),
        }
    }
}

/// An immutable, fully decoded audio file. Samples are stored per channel.
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    length: usize,
}

impl AudioBuffer {
    /// Creates a buffer from planar samples. All channels must hold the same number of samples.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<AudioBuffer, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::Corrupt("sample rate is zero".into()));
        }
        if channels.is_empty() || channels.len() > usize::from(u16::MAX) {
            return Err(DecodeError::Corrupt(format!(
                "unsupported channel count {}",
                channels.len()
            )));
        }

        let length = channels[0].len();
        if channels.iter().any(|channel| channel.len() != length) {
            return Err(DecodeError::Corrupt("channels differ in length".into()));
        }

        Ok(AudioBuffer {
            sample_rate,
            channels,
            length,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        // Bounded by the constructor.
        self.channels.len() as u16
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|channel| channel.as_slice())
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.length as f64 / f64::from(self.sample_rate)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    /// Copies the frames in [start, end) of every channel into a new buffer with the same
    /// layout and sample rate. The range is clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> AudioBuffer {
        let end = end.min(self.length);
        let start = start.min(end);
        AudioBuffer {
            sample_rate: self.sample_rate,
            channels: self
                .channels
                .iter()
                .map(|channel| channel[start..end].to_vec())
                .collect(),
            length: end - start,
        }
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels.len())
            .field("length", &self.length)
            .finish()
    }
}

/// Decodes an uploaded file into an [`AudioBuffer`]. Only RIFF/WAVE input is accepted;
/// integer samples are normalised to [-1, 1).
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
    sniff(bytes)?;

    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let num_channels = usize::from(spec.channels);
    if num_channels == 0 {
        return Err(DecodeError::Corrupt("no channels".into()));
    }

    // The header's frame count is untrusted; never reserve more than the input can hold.
    let block_align = num_channels * usize::from(spec.bits_per_sample.div_ceil(8)).max(1);
    let frames = (reader.duration() as usize).min(bytes.len() / block_align);
    let mut channels = vec![Vec::with_capacity(frames); num_channels];
    match spec.sample_format {
        SampleFormat::Float => {
            for (i, sample) in reader.into_samples::<f32>().enumerate() {
                channels[i % num_channels].push(sample?);
            }
        }
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            for (i, sample) in reader.into_samples::<i32>().enumerate() {
                channels[i % num_channels].push(sample? as f32 * scale);
            }
        }
    }

    // Drop a trailing partial frame.
    let length = channels.iter().map(Vec::len).min().unwrap_or(0);
    if length == 0 {
        return Err(DecodeError::Corrupt("no audio frames".into()));
    }
    channels.iter_mut().for_each(|channel| channel.truncate(length));

    info!(
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        frames = length,
        "Decoded audio"
    );

    AudioBuffer::new(spec.sample_rate, channels)
}

/// Rejects anything that isn't a RIFF/WAVE container, naming common compressed formats.
fn sniff(bytes: &[u8]) -> Result<(), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Corrupt("file is empty".into()));
    }
    if bytes.starts_with(b"RIFF") {
        return match bytes.get(8..12) {
            Some(b"WAVE") => Ok(()),
            Some(_) => Err(DecodeError::UnsupportedFormat(
                "RIFF file is not a WAVE file".into(),
            )),
            None => Err(DecodeError::Corrupt("truncated RIFF header".into())),
        };
    }

    let mpeg_sync = bytes.len() > 1 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0;
    let format = if bytes.starts_with(b"ID3") || mpeg_sync {
        "MP3"
    } else if bytes.starts_with(b"OggS") {
        "Ogg"
    } else if bytes.starts_with(b"fLaC") {
        "FLAC"
    } else if bytes.get(4..8) == Some(b"ftyp") {
        "MP4/AAC"
    } else {
        return Err(DecodeError::UnsupportedFormat(
            "unrecognized audio container".into(),
        ));
    };
    Err(DecodeError::UnsupportedFormat(format!(
        "{} audio is not supported",
        format
    )))
}
