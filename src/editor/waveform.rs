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
//! Peak-envelope waveform rendering.
//!
//! [`render`] is a pure function of its inputs. It produces a [`Raster`] of layered cells
//! that a canvas, a texture upload or a terminal can draw however it likes.
use std::ops::BitOr;

use super::{region::LoopRegion, view::ViewWindow};
use crate::audio::AudioBuffer;

/// The layers drawn into one raster cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell(u8);

impl Cell {
    pub const EMPTY: Cell = Cell(0);
    /// Part of a column's min/max segment.
    pub const WAVE: Cell = Cell(1);
    /// Inside the translucent loop region fill.
    pub const REGION: Cell = Cell(1 << 1);
    /// On the playhead line.
    pub const PLAYHEAD: Cell = Cell(1 << 2);

    pub fn contains(self, layer: Cell) -> bool {
        self.0 & layer.0 == layer.0 && layer.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Cell {
    type Output = Cell;

    fn bitor(self, rhs: Cell) -> Cell {
        Cell(self.0 | rhs.0)
    }
}

/// Raster dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSize {
    pub width: usize,
    pub height: usize,
}

/// A rendered waveform, stored row by row from the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    peaks: Vec<Option<(f32, f32)>>,
}

impl Raster {
    pub fn blank(size: RasterSize) -> Raster {
        Raster {
            width: size.width,
            height: size.height,
            cells: vec![Cell::EMPTY; size.width * size.height],
            peaks: vec![None; size.width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The cell at column `x`, row `y`. Out of range positions are empty.
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        if x >= self.width || y >= self.height {
            return Cell::EMPTY;
        }
        self.cells[y * self.width + x]
    }

    /// The (min, max) sample values drawn in a column, if the column shows any audio.
    pub fn peak(&self, x: usize) -> Option<(f32, f32)> {
        self.peaks.get(x).copied().flatten()
    }

    /// Columns containing the given layer in any row.
    pub fn columns_with(&self, layer: Cell) -> Vec<usize> {
        (0..self.width)
            .filter(|&x| (0..self.height).any(|y| self.cell(x, y).contains(layer)))
            .collect()
    }

    fn paint(&mut self, x: usize, y: usize, layer: Cell) {
        let cell = &mut self.cells[y * self.width + x];
        *cell = *cell | layer;
    }

    fn paint_column(&mut self, x: usize, rows: std::ops::RangeInclusive<usize>, layer: Cell) {
        for y in rows {
            self.paint(x, y, layer);
        }
    }

    /// Draws the raster as text, one line per row.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cell(x, y);
                text.push(if cell.contains(Cell::PLAYHEAD) {
                    '|'
                } else if cell.contains(Cell::WAVE | Cell::REGION) {
                    '#'
                } else if cell.contains(Cell::WAVE) {
                    '+'
                } else if cell.contains(Cell::REGION) {
                    '.'
                } else {
                    ' '
                });
            }
            text.push('\n');
        }
        text
    }
}

/// Row of a sample value. +1 is the top row, -1 the bottom one.
fn row_of(value: f32, height: usize) -> usize {
    let value = value.clamp(-1.0, 1.0);
    let row = ((1.0 - value) * 0.5 * (height - 1) as f32).round();
    (row as usize).min(height - 1)
}

/// Renders the first channel of `buffer` as seen through `view`, with the loop region and
/// an optional playhead (a fraction of the whole buffer) overlaid. Anything outside the
/// visible window is left out.
pub fn render(
    buffer: &AudioBuffer,
    view: &ViewWindow,
    region: &LoopRegion,
    playhead: Option<f64>,
    size: RasterSize,
) -> Raster {
    let mut raster = Raster::blank(size);
    let (width, height) = (size.width, size.height);
    let Some(samples) = buffer.channel(0) else {
        return raster;
    };
    if width == 0 || height == 0 || samples.is_empty() {
        return raster;
    }

    let len = samples.len();
    let window = view.visible(len);
    let all_rows = 0..=height - 1;

    // Region fill first so the waveform is drawn over it.
    let region_from = window.x_of(region.start() * len as f64, width);
    let region_to = window.x_of(region.end() * len as f64, width);
    if region_from < region_to {
        let first = region_from.max(0.0).floor() as usize;
        let last = region_to.min(width as f64).ceil() as usize;
        for x in first..last.min(width) {
            raster.paint_column(x, all_rows.clone(), Cell::REGION);
        }
    }

    let step = window.length / width as f64;
    for x in 0..width {
        let from = (window.start + x as f64 * step).floor() as usize;
        if from >= len {
            break;
        }
        let to = ((window.start + (x + 1) as f64 * step).floor() as usize).clamp(from + 1, len);

        let (min, max) = samples[from..to]
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &sample| {
                (min.min(sample), max.max(sample))
            });
        if min > max {
            continue;
        }
        raster.peaks[x] = Some((min, max));
        raster.paint_column(x, row_of(max, height)..=row_of(min, height), Cell::WAVE);
    }

    if let Some(playhead) = playhead {
        let x = window.x_of(playhead * len as f64, width);
        if x >= 0.0 && x < width as f64 {
            raster.paint_column(x.floor() as usize, all_rows, Cell::PLAYHEAD);
        }
    }

    raster
}
