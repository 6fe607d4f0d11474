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
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info, span, Level};

use super::{
    mixer::{AudioMixer, Voice},
    DeviceInfo, PlayRequest, PlaybackError, PlaybackHandle,
};
use crate::config;

const STREAM_START_TIMEOUT: Duration = Duration::from_secs(5);

/// A cpal output. Voices are handed to the stream callback over a channel and mixed there.
pub struct Device {
    name: String,
    host_id: cpal::HostId,
    channels: u16,
    sample_rate: u32,
    voice_tx: Sender<Voice>,
    running: Arc<AtomicBool>,
    stream_failed: Arc<AtomicBool>,
}

struct FoundDevice {
    host_id: cpal::HostId,
    name: String,
    device: cpal::Device,
    max_channels: u16,
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|found| DeviceInfo {
                name: found.name,
                host: found.host_id.name().to_string(),
                max_channels: found.max_channels,
            })
            .collect())
    }

    fn list_cpal_devices() -> Result<Vec<FoundDevice>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(FoundDevice {
                        host_id,
                        name: device.name()?,
                        device,
                        max_channels,
                    });
                }
            }
        }

        devices.sort_by_key(|found| found.name.to_string());
        Ok(devices)
    }

    /// Opens the configured device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let (host_id, device) = if name == config::DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or("no default output device")?;
            (host.id(), device)
        } else {
            let found = Device::list_cpal_devices()?
                .into_iter()
                .find(|found| found.name.trim() == name)
                .ok_or_else(|| format!("no device found with name {}", name))?;
            (found.host_id, found.device)
        };

        let supported = device.default_output_config()?;
        let sample_rate = config
            .sample_rate()
            .unwrap_or_else(|| supported.sample_rate().0);
        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let running = Arc::new(AtomicBool::new(true));
        let stream_failed = Arc::new(AtomicBool::new(false));
        {
            let running = running.clone();
            let stream_failed = stream_failed.clone();
            let sample_format = supported.sample_format();
            let stream_config = stream_config.clone();
            // The stream is created, kept and dropped on this thread.
            thread::spawn(move || {
                Device::run_output(
                    device,
                    stream_config,
                    sample_format,
                    voice_rx,
                    ready_tx,
                    running,
                    stream_failed,
                )
            });
        }

        match ready_rx.recv_timeout(STREAM_START_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err("timed out starting the output stream".into()),
        }

        info!(
            device = name,
            channels = stream_config.channels,
            sample_rate,
            "Output stream started"
        );
        Ok(Device {
            name: name.to_string(),
            host_id,
            channels: stream_config.channels,
            sample_rate,
            voice_tx,
            running,
            stream_failed,
        })
    }

    fn run_output(
        device: cpal::Device,
        config: cpal::StreamConfig,
        sample_format: cpal::SampleFormat,
        voice_rx: Receiver<Voice>,
        ready_tx: Sender<Result<(), String>>,
        running: Arc<AtomicBool>,
        stream_failed: Arc<AtomicBool>,
    ) {
        let mixer = AudioMixer::new(config.channels, config.sample_rate.0);
        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, mixer, voice_rx, stream_failed)
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, mixer, voice_rx, stream_failed)
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &config, mixer, voice_rx, stream_failed)
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, mixer, voice_rx, stream_failed)
            }
            other => Err(format!("unsupported sample format {:?}", other).into()),
        };

        let stream = match stream.and_then(|stream| {
            stream.play()?;
            Ok(stream)
        }) {
            Ok(stream) => stream,
            Err(e) => {
                error!(err = e.to_string(), "Failed to start CPAL stream");
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
        };
        let _ = ready_tx.send(Ok(()));

        // Keep the stream alive until the device is dropped.
        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(100));
        }
        drop(stream);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: AudioMixer,
    voice_rx: Receiver<Voice>,
    stream_failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(voice) = voice_rx.try_recv() {
                mixer.add_voice(voice);
            }
            if scratch.len() != data.len() {
                scratch.resize(data.len(), 0.0);
            }
            mixer.process_into(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        move |err| {
            error!("CPAL output stream error: {}", err);
            stream_failed.store(true, Ordering::Relaxed);
        },
        None,
    )?;
    Ok(stream)
}

impl Drop for Device {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl super::Device for Device {
    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, PlaybackError> {
        let span = span!(Level::INFO, "play (cpal)");
        let _enter = span.enter();

        if self.stream_failed.load(Ordering::Relaxed) {
            return Err(PlaybackError::Rejected(format!(
                "output stream for {} has failed",
                self.name
            )));
        }

        let (handle, voice) = PlaybackHandle::start(request, self.sample_rate)?;
        info!(
            device = self.name,
            id = handle.id(),
            label = handle.label(),
            rate = handle.rate(),
            looping = handle.is_looping(),
            "Playing."
        );
        self.voice_tx
            .send(voice)
            .map_err(|_| PlaybackError::Rejected("output stream has stopped".into()))?;
        Ok(handle)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_failed(&self) -> bool {
        self.stream_failed.load(Ordering::Relaxed)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.channels,
            self.host_id.name()
        )
    }
}
