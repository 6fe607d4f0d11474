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
use std::path::PathBuf;

use serde::Deserialize;

use crate::pads::{clamp_rate, DEFAULT_RATE};

/// A YAML representation of the pad bank defaults.
#[derive(Deserialize, Clone, Default)]
pub struct Pads {
    /// Directory holding beat1.wav to beat8.wav.
    beats_dir: Option<PathBuf>,

    /// Initial playback rate of every pad, clamped to [0.5, 1.5] (default: 1.0).
    default_rate: Option<f64>,
}

impl Pads {
    /// Returns the directory the built-in beats are loaded from.
    pub fn beats_dir(&self) -> Option<PathBuf> {
        self.beats_dir.clone()
    }

    /// Returns the initial pad rate.
    pub fn default_rate(&self) -> f64 {
        self.default_rate
            .and_then(clamp_rate)
            .unwrap_or(DEFAULT_RATE)
    }
}
