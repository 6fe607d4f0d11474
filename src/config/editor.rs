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
use serde::Deserialize;

use crate::editor::{EditorSettings, RasterSize, DEFAULT_MAX_ZOOM, MIN_ZOOM};

const DEFAULT_RASTER_WIDTH: usize = 1000;
const DEFAULT_RASTER_HEIGHT: usize = 150;

/// A YAML representation of the editor defaults.
#[derive(Deserialize, Clone, Default)]
pub struct Editor {
    /// Largest zoom factor (default: 40).
    max_zoom: Option<f64>,

    /// Waveform raster width in columns (default: 1000).
    raster_width: Option<usize>,

    /// Waveform raster height in rows (default: 150).
    raster_height: Option<usize>,

    /// Whether previews loop when a file is loaded (default: true).
    loop_enabled: Option<bool>,
}

impl Editor {
    /// Returns the largest zoom factor. Never below 1.
    pub fn max_zoom(&self) -> f64 {
        match self.max_zoom {
            Some(zoom) if zoom.is_finite() => zoom.max(MIN_ZOOM),
            _ => DEFAULT_MAX_ZOOM,
        }
    }

    /// Returns the raster size. Zero dimensions fall back to the defaults.
    pub fn raster(&self) -> RasterSize {
        RasterSize {
            width: self
                .raster_width
                .filter(|width| *width > 0)
                .unwrap_or(DEFAULT_RASTER_WIDTH),
            height: self
                .raster_height
                .filter(|height| *height > 0)
                .unwrap_or(DEFAULT_RASTER_HEIGHT),
        }
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.unwrap_or(true)
    }

    /// Converts the configuration into editor session settings.
    pub fn settings(&self) -> EditorSettings {
        EditorSettings {
            max_zoom: self.max_zoom(),
            raster: self.raster(),
            loop_enabled: self.loop_enabled(),
        }
    }
}
