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
//! 16-bit PCM WAV encoding.
//!
//! The layout is fixed: a 12 byte RIFF/WAVE header, a 16 byte `fmt ` chunk and a single
//! `data` chunk of interleaved little-endian samples. Other tools read these files, so
//! nothing here may change without changing every reader.
use super::AudioBuffer;

/// Size of everything before the sample data.
pub const HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{0} bytes of sample data do not fit in a WAV file")]
    TooLarge(u64),
}

/// Converts a float sample to 16-bit PCM. Negative values scale by 32768 and positive
/// values by 32767, then truncate toward zero. NaN encodes as silence.
pub fn quantize(sample: f32) -> i16 {
    // Scale in f64 so truncation matches double precision encoders bit for bit.
    let sample = f64::from(sample).clamp(-1.0, 1.0);
    let scaled = if sample < 0.0 {
        sample * 32768.0
    } else {
        sample * 32767.0
    };
    scaled as i16
}

/// Encodes the whole buffer as 16-bit PCM WAV.
pub fn encode_pcm16(buffer: &AudioBuffer) -> Result<Vec<u8>, EncodeError> {
    let channels = buffer.channel_count();
    let sample_rate = buffer.sample_rate();
    let block_align = usize::from(channels) * BYTES_PER_SAMPLE;

    let data_len = buffer.len() as u64 * block_align as u64;
    let riff_len = data_len + (HEADER_LEN as u64 - 8);
    if riff_len > u64::from(u32::MAX) {
        return Err(EncodeError::TooLarge(data_len));
    }
    let byte_rate = u64::from(sample_rate) * block_align as u64;
    let byte_rate = u32::try_from(byte_rate).map_err(|_| EncodeError::TooLarge(data_len))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(riff_len as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&(block_align as u16).to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data_len as u32).to_le_bytes());
    for frame in 0..buffer.len() {
        for channel in buffer.channels() {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    #[test]
    fn test_quantize_is_asymmetric() {
        assert_eq!(32767, quantize(1.0));
        assert_eq!(-32768, quantize(-1.0));
        assert_eq!(16383, quantize(0.5));
        assert_eq!(-16384, quantize(-0.5));
        assert_eq!(0, quantize(0.0));
        assert_eq!(0, quantize(-0.0));
        // Truncation, not rounding.
        assert_eq!(0, quantize(0.00003));
        assert_eq!(0, quantize(-0.00003));
        assert_eq!(32767, quantize(7.5));
        assert_eq!(-32768, quantize(-3.0));
        assert_eq!(0, quantize(f32::NAN));
    }

    #[test]
    fn test_header_layout() {
        let buffer = AudioBuffer::new(
            44100,
            vec![vec![0.0, 0.5, -0.5], vec![1.0, -1.0, 0.25]],
        )
        .expect("buffer");
        let bytes = encode_pcm16(&buffer).expect("encode");

        assert_eq!(HEADER_LEN + 3 * 2 * 2, bytes.len());
        assert_eq!(b"RIFF", &bytes[0..4]);
        assert_eq!(36 + 12, u32_at(&bytes, 4));
        assert_eq!(b"WAVE", &bytes[8..12]);
        assert_eq!(b"fmt ", &bytes[12..16]);
        assert_eq!(16, u32_at(&bytes, 16));
        assert_eq!(1, u16_at(&bytes, 20));
        assert_eq!(2, u16_at(&bytes, 22));
        assert_eq!(44100, u32_at(&bytes, 24));
        assert_eq!(44100 * 2 * 2, u32_at(&bytes, 28));
        assert_eq!(4, u16_at(&bytes, 32));
        assert_eq!(16, u16_at(&bytes, 34));
        assert_eq!(b"data", &bytes[36..40]);
        assert_eq!(12, u32_at(&bytes, 40));

        // Interleaved frames.
        let samples: Vec<i16> = bytes[HEADER_LEN..]
            .chunks(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(vec![0, 32767, 16383, -32768, -16384, 8191], samples);
    }

    #[test]
    fn test_readable_by_hound() {
        let buffer = AudioBuffer::new(22050, vec![vec![0.1; 100]; 3]).expect("buffer");
        let bytes = encode_pcm16(&buffer).expect("encode");

        let reader = hound::WavReader::new(Cursor::new(bytes)).expect("reader");
        let spec = reader.spec();
        assert_eq!(3, spec.channels);
        assert_eq!(22050, spec.sample_rate);
        assert_eq!(16, spec.bits_per_sample);
        assert_eq!(hound::SampleFormat::Int, spec.sample_format);
        assert_eq!(100, reader.duration());
    }
}
