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
    fmt,
    sync::{Arc, Weak},
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use super::{mixer::AudioMixer, PlayRequest, PlaybackError, PlaybackHandle};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const NUM_CHANNELS: u16 = 2;
const REALTIME_TICK: Duration = Duration::from_millis(10);

/// Something the mock device was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Play { id: u64, label: String },
    Stop { id: u64 },
}

struct State {
    mixer: AudioMixer,
    events: Vec<DeviceEvent>,
    reject_next: Option<String>,
    failed: bool,
    scratch: Vec<f32>,
}

/// A mock device. Doesn't actually play anything. Time only moves when [`Device::advance`]
/// is called, or on a background clock for devices made with [`Device::realtime`].
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    state: Arc<Mutex<State>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device::with_sample_rate(name, DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(name: &str, sample_rate: u32) -> Device {
        Device {
            name: name.to_string(),
            sample_rate,
            state: Arc::new(Mutex::new(State {
                mixer: AudioMixer::new(NUM_CHANNELS, sample_rate),
                events: Vec::new(),
                reject_next: None,
                failed: false,
                scratch: Vec::new(),
            })),
        }
    }

    /// Gets a mock device whose clock follows wall time. The clock stops when the last
    /// clone of the device is dropped.
    pub fn realtime(name: &str, sample_rate: Option<u32>) -> Device {
        let device = Device::with_sample_rate(name, sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE));
        let state = Arc::downgrade(&device.state);
        let frames_per_tick =
            (REALTIME_TICK.as_secs_f64() * f64::from(device.sample_rate)).round() as usize;
        thread::spawn(move || Device::run_clock(state, frames_per_tick));
        device
    }

    fn run_clock(state: Weak<Mutex<State>>, frames_per_tick: usize) {
        while let Some(strong) = state.upgrade() {
            Device::render(&mut strong.lock(), frames_per_tick);
            drop(strong);
            thread::sleep(REALTIME_TICK);
        }
    }

    fn render(state: &mut State, frames: usize) {
        if state.failed {
            state.scratch.clear();
            return;
        }
        let samples = frames * usize::from(state.mixer.num_channels());
        let mut scratch = std::mem::take(&mut state.scratch);
        scratch.resize(samples, 0.0);
        state.mixer.process_into(&mut scratch);
        state.scratch = scratch;
    }

    /// Renders the given number of frames and returns the interleaved output.
    pub fn advance(&self, frames: usize) -> Vec<f32> {
        let mut state = self.state.lock();
        Device::render(&mut state, frames);
        state.scratch.clone()
    }

    /// Makes the next play request fail, as an output locked by autoplay policy would.
    pub fn reject_next(&self, reason: &str) {
        self.state.lock().reject_next = Some(reason.to_string());
    }

    /// Breaks the output, as a disconnected interface would. Nothing renders afterwards and
    /// play requests are refused.
    pub fn fail(&self) {
        self.state.lock().failed = true;
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state.lock().events.clone()
    }

    pub fn active_voices(&self) -> usize {
        self.state.lock().mixer.active_voices()
    }
}

impl super::Device for Device {
    fn play(&self, request: PlayRequest) -> Result<PlaybackHandle, PlaybackError> {
        let span = span!(Level::INFO, "play (mock)");
        let _enter = span.enter();

        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next.take() {
            return Err(PlaybackError::Rejected(reason));
        }
        if state.failed {
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
            "Playing."
        );
        state.events.push(DeviceEvent::Play {
            id: handle.id(),
            label: handle.label().to_string(),
        });
        state.mixer.add_voice(voice);
        Ok(handle)
    }

    fn stop(&self, handle: &PlaybackHandle) {
        let mut state = self.state.lock();
        state.events.push(DeviceEvent::Stop { id: handle.id() });
        handle.stop();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_failed(&self) -> bool {
        self.state.lock().failed
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
