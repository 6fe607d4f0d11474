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
//! The eight trigger pads: their settings, the clips saved to them, and the controller that
//! plays them.
mod bank;
mod clips;
mod controller;

pub use bank::{
    clamp_rate, PadBank, PadId, PadSlot, PadSource, DEFAULT_RATE, MAX_RATE, MIN_RATE, PAD_COUNT,
};
pub use clips::{ClipError, ClipStore, ClipUri};
pub use controller::{TriggerController, TriggerOutcome};

use crate::audio::PlaybackError;

#[derive(Debug, thiserror::Error)]
pub enum PadError {
    #[error("no such pad {0}, pads are numbered 1 to 8")]
    InvalidPad(u8),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
