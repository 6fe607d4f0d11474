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
use std::{
    any::TypeId,
    error::Error,
    f32::consts::PI,
    fs::File,
    io::{Cursor, Seek, Write},
    path::PathBuf,
    thread,
    time::{Duration, SystemTime},
};

use hound::{Sample, SampleFormat, WavSpec, WavWriter};

/// Wait for the given predicate to return true or fail.
#[inline]
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().expect("System time error");
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

/// Generates a sine wave at the given frequency and amplitude.
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Generates a ramp from -1 to just under 1.
pub fn ramp(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| -1.0 + 2.0 * i as f32 / frames as f32)
        .collect()
}

fn spec_for<S: 'static>(channels: usize, sample_rate: u32, bits_per_sample: u16) -> WavSpec {
    let sample_format = if TypeId::of::<S>() == TypeId::of::<f32>() {
        SampleFormat::Float
    } else {
        SampleFormat::Int
    };
    assert!(channels <= u16::MAX.into(), "Too many channels!");
    WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample,
        sample_format,
    }
}

fn write_interleaved<W, S>(
    writer: W,
    samples: &[Vec<S>],
    spec: WavSpec,
) -> Result<(), Box<dyn Error>>
where
    W: Write + Seek,
    S: Sample + Copy,
{
    let mut writer = WavWriter::new(writer, spec)?;
    let frames = samples.iter().map(Vec::len).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in samples {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Writes a WAV file with one vector per channel. The bit depth follows the sample type.
pub fn write_wav<S: Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let bits_per_sample = if TypeId::of::<S>() == TypeId::of::<i16>() {
        16
    } else if TypeId::of::<S>() == TypeId::of::<i8>() {
        8
    } else {
        32
    };
    let spec = spec_for::<S>(samples.len(), sample_rate, bits_per_sample);
    write_interleaved(File::create(path)?, &samples, spec)
}

/// Builds in-memory WAV bytes with one vector per channel.
pub fn wav_bytes<S: Sample + Copy + 'static>(
    samples: &[Vec<S>],
    sample_rate: u32,
    bits_per_sample: u16,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    let spec = spec_for::<S>(samples.len(), sample_rate, bits_per_sample);
    write_interleaved(Cursor::new(&mut bytes), samples, spec).expect("in-memory wav");
    bytes
}
