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
//! The sample editor: loop selection, waveform rendering, preview and extraction.
use crate::audio::{DecodeError, PlaybackError};
use crate::pads::PadError;

mod extract;
mod preview;
mod region;
mod session;
mod timefield;
mod view;
mod waveform;

pub use extract::{extract, EncodedClip, ExtractError};
pub use preview::PreviewPlayer;
pub use region::{Handle, LoopRegion, RegionSelector};
pub use session::{EditorSession, EditorSettings};
pub use timefield::{TimePart, TimeParts};
pub use view::{SampleWindow, ViewWindow, DEFAULT_MAX_ZOOM, MIN_ZOOM};
pub use waveform::{render, Cell, Raster, RasterSize};

/// Errors surfaced by editor operations. None of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("No audio has been loaded")]
    NoAudio,
    #[error("The editor session is closed")]
    SessionClosed,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Pad(#[from] PadError),
}
