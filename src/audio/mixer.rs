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
// Voice rendering shared by the cpal and mock devices.
use std::sync::Arc;

use super::{
    handle::{PlaybackEnd, VoiceControl},
    AudioBuffer,
};

/// A buffer being rendered into the output.
pub struct Voice {
    id: u64,
    buffer: Arc<AudioBuffer>,
    control: Arc<VoiceControl>,
    /// Read position in source frames.
    position: f64,
    /// Source frames per output frame at rate 1.0.
    rate_scale: f64,
}

impl Voice {
    pub(crate) fn new(
        id: u64,
        buffer: Arc<AudioBuffer>,
        control: Arc<VoiceControl>,
        start_frame: usize,
        output_rate: u32,
    ) -> Voice {
        let rate_scale = f64::from(buffer.sample_rate()) / f64::from(output_rate.max(1));
        Voice {
            id,
            buffer,
            control,
            position: start_frame as f64,
            rate_scale,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mixes this voice into the interleaved output. Returns false once the voice is done.
    fn render(&mut self, output: &mut [f32], num_channels: usize) -> bool {
        let bounds = self.control.bounds();
        let looping = self.control.is_looping();
        let step = self.control.rate() * self.rate_scale;
        let start = bounds.start as f64;
        let end = bounds.end.min(self.buffer.len()) as f64;
        if end <= start {
            self.control.finish(PlaybackEnd::Finished);
            return false;
        }

        for frame in output.chunks_exact_mut(num_channels) {
            if self.position >= end {
                if !looping {
                    self.control.store_position(end);
                    self.control.finish(PlaybackEnd::Finished);
                    return false;
                }
                self.position = start + (self.position - end) % (end - start);
            }

            self.mix_frame(frame);
            self.position += step;
        }

        // A single pass that ran out exactly at the block boundary is done now.
        if !looping && self.position >= end {
            self.control.store_position(end);
            self.control.finish(PlaybackEnd::Finished);
            return false;
        }
        self.control.store_position(self.position);
        true
    }

    /// Adds the interpolated sample at the current position to one output frame.
    fn mix_frame(&self, frame: &mut [f32]) {
        let index = self.position as usize;
        let fraction = (self.position - index as f64) as f32;
        let channels = self.buffer.channels();
        let sample_at = |channel: &[f32]| {
            let current = channel[index];
            let next = channel.get(index + 1).copied().unwrap_or(current);
            current + (next - current) * fraction
        };

        if frame.len() == 1 {
            let sum: f32 = channels.iter().map(|channel| sample_at(channel)).sum();
            frame[0] += sum / channels.len() as f32;
        } else if channels.len() == 1 {
            let sample = sample_at(&channels[0]);
            frame.iter_mut().for_each(|out| *out += sample);
        } else {
            frame
                .iter_mut()
                .zip(channels.iter())
                .for_each(|(out, channel)| *out += sample_at(channel));
        }
    }
}

/// Sums active voices into an interleaved output buffer.
pub struct AudioMixer {
    voices: Vec<Voice>,
    num_channels: u16,
    sample_rate: u32,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        Self {
            voices: Vec::new(),
            num_channels: num_channels.max(1),
            sample_rate,
        }
    }

    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn add_voice(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Renders into `output`, which holds whole frames of `num_channels` samples.
    /// Stopped and finished voices are dropped and their handles notified.
    pub fn process_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let num_channels = usize::from(self.num_channels);

        self.voices.retain_mut(|voice| {
            if voice.control.is_stop_requested() {
                voice.control.finish(PlaybackEnd::Stopped);
                return false;
            }
            voice.render(output, num_channels)
        });
    }
}
