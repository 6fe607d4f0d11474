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
//! Waveform loop editor and eight-pad trigger engine.
//!
//! An uploaded file is decoded into an [`audio::AudioBuffer`], trimmed in an
//! [`editor::EditorSession`], encoded to 16-bit PCM WAV and assigned to one of
//! the pads owned by [`pads::TriggerController`]. The [`engine::Engine`] ties
//! these together behind the interface a UI layer calls into.
pub mod audio;
pub mod config;
pub mod editor;
pub mod engine;
pub mod pads;
pub mod util;

#[cfg(test)]
mod testutil;

pub use engine::{Engine, EngineEvent, SessionHandle};
