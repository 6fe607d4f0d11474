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
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use super::{mixer::Voice, AudioBuffer, PlaybackError};

/// Global counter for unique handle IDs.
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// How a voice stopped sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// A single pass reached the end of its range.
    Finished,
    /// The voice was stopped before it finished.
    Stopped,
}

/// What to play and how.
#[derive(Clone)]
pub struct PlayRequest {
    pub buffer: Arc<AudioBuffer>,
    /// First frame played, and the frame a loop wraps back to.
    pub start_frame: usize,
    /// One past the last frame played.
    pub end_frame: usize,
    pub looping: bool,
    /// Speed multiplier, 1.0 being the buffer's own rate.
    pub rate: f64,
    /// Name used in logs.
    pub label: String,
}

impl PlayRequest {
    /// Plays a whole buffer from the first frame.
    pub fn whole(buffer: Arc<AudioBuffer>, looping: bool, rate: f64) -> PlayRequest {
        let end_frame = buffer.len();
        PlayRequest {
            buffer,
            start_frame: 0,
            end_frame,
            looping,
            rate,
            label: String::new(),
        }
    }

    /// Plays the frames in [start_frame, end_frame) at the buffer's own rate.
    pub fn region(
        buffer: Arc<AudioBuffer>,
        start_frame: usize,
        end_frame: usize,
        looping: bool,
    ) -> PlayRequest {
        PlayRequest {
            buffer,
            start_frame,
            end_frame,
            looping,
            rate: 1.0,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> PlayRequest {
        self.label = label.into();
        self
    }

    fn validate(&self) -> Result<(), PlaybackError> {
        let len = self.buffer.len();
        if self.end_frame <= self.start_frame || self.end_frame > len {
            return Err(PlaybackError::InvalidRegion {
                start: self.start_frame as f64 / len.max(1) as f64,
                end: self.end_frame as f64 / len.max(1) as f64,
            });
        }
        Ok(())
    }
}

/// Loop bounds in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub start: usize,
    pub end: usize,
}

/// State shared between a handle and the voice rendering it.
pub(crate) struct VoiceControl {
    stop_requested: AtomicBool,
    finished: AtomicBool,
    looping: AtomicBool,
    rate: AtomicU64,
    position: AtomicU64,
    bounds: Mutex<Bounds>,
    ended: Sender<PlaybackEnd>,
}

impl VoiceControl {
    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    pub(crate) fn rate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Relaxed))
    }

    pub(crate) fn bounds(&self) -> Bounds {
        *self.bounds.lock()
    }

    pub(crate) fn store_position(&self, frames: f64) {
        self.position.store(frames.to_bits(), Ordering::Relaxed);
    }

    /// Marks the voice as done and fires the completion channel. Only the first call counts.
    pub(crate) fn finish(&self, end: PlaybackEnd) {
        if !self.finished.swap(true, Ordering::AcqRel) {
            let _ = self.ended.try_send(end);
        }
    }
}

/// A live voice. Dropping the handle does not stop the sound; call [`PlaybackHandle::stop`].
pub struct PlaybackHandle {
    id: u64,
    label: String,
    control: Arc<VoiceControl>,
    ended: Receiver<PlaybackEnd>,
}

impl PlaybackHandle {
    /// Validates the request and creates the handle together with the voice that renders it.
    /// `output_rate` is the rate of the device the voice will be mixed into.
    pub(crate) fn start(
        request: PlayRequest,
        output_rate: u32,
    ) -> Result<(PlaybackHandle, Voice), PlaybackError> {
        request.validate()?;

        let (ended_tx, ended_rx) = crossbeam_channel::bounded(1);
        let control = Arc::new(VoiceControl {
            stop_requested: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            looping: AtomicBool::new(request.looping),
            rate: AtomicU64::new(request.rate.to_bits()),
            position: AtomicU64::new((request.start_frame as f64).to_bits()),
            bounds: Mutex::new(Bounds {
                start: request.start_frame,
                end: request.end_frame,
            }),
            ended: ended_tx,
        });

        let handle = PlaybackHandle {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            label: request.label,
            control: control.clone(),
            ended: ended_rx,
        };
        let voice = Voice::new(
            handle.id,
            request.buffer,
            control,
            request.start_frame,
            output_rate,
        );
        Ok((handle, voice))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Requests the voice stop. Calling this more than once has no further effect.
    pub fn stop(&self) {
        self.control.stop_requested.store(true, Ordering::Release);
    }

    /// True once the voice has ended, naturally or by being stopped.
    pub fn is_finished(&self) -> bool {
        self.control.finished.load(Ordering::Acquire)
            || self.control.stop_requested.load(Ordering::Acquire)
    }

    pub fn rate(&self) -> f64 {
        self.control.rate()
    }

    /// Changes the speed of the voice from the next rendered block.
    pub fn set_rate(&self, rate: f64) {
        self.control.rate.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn is_looping(&self) -> bool {
        self.control.is_looping()
    }

    /// Switches between looping and a single pass. A voice switched to a single pass
    /// finishes at the current end bound.
    pub fn set_looping(&self, looping: bool) {
        self.control.looping.store(looping, Ordering::Relaxed);
    }

    /// Moves the loop bounds of a running voice. Empty ranges are ignored.
    pub fn set_bounds(&self, start_frame: usize, end_frame: usize) -> bool {
        if end_frame <= start_frame {
            return false;
        }
        *self.control.bounds.lock() = Bounds {
            start: start_frame,
            end: end_frame,
        };
        true
    }

    /// Current read position in source frames.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.control.position.load(Ordering::Relaxed))
    }

    /// Returns how the voice ended, if it has. Never blocks.
    pub fn try_ended(&self) -> Option<PlaybackEnd> {
        match self.ended.try_recv() {
            Ok(end) => Some(end),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(PlaybackEnd::Stopped),
        }
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("rate", &self.rate())
            .field("looping", &self.is_looping())
            .field("finished", &self.is_finished())
            .finish()
    }
}
