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
/// The smallest zoom, showing the whole buffer.
pub const MIN_ZOOM: f64 = 1.0;

/// The default largest zoom.
pub const DEFAULT_MAX_ZOOM: f64 = 40.0;

/// The visible part of a buffer as a zoom factor and a pan offset.
/// `1 <= zoom <= max_zoom` and `0 <= pan <= 1 - 1/zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    zoom: f64,
    pan: f64,
    max_zoom: f64,
}

impl Default for ViewWindow {
    fn default() -> Self {
        ViewWindow::new(DEFAULT_MAX_ZOOM)
    }
}

/// The largest pan for a zoom level.
pub fn max_pan(zoom: f64) -> f64 {
    if zoom > MIN_ZOOM {
        1.0 - 1.0 / zoom
    } else {
        0.0
    }
}

impl ViewWindow {
    /// A fully zoomed out view that can zoom in up to `max_zoom`.
    pub fn new(max_zoom: f64) -> ViewWindow {
        let max_zoom = if max_zoom.is_finite() {
            max_zoom.max(MIN_ZOOM)
        } else {
            DEFAULT_MAX_ZOOM
        };
        ViewWindow {
            zoom: MIN_ZOOM,
            pan: 0.0,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Sets the zoom and pulls the pan back inside the new limit. Non-finite input is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, self.max_zoom);
        self.pan = self.pan.min(max_pan(self.zoom));
    }

    /// Sets the pan, clamped for the current zoom.
    pub fn set_pan(&mut self, pan: f64) {
        self.pan = if pan.is_nan() {
            0.0
        } else {
            pan.clamp(0.0, max_pan(self.zoom))
        };
    }

    pub fn reset(&mut self) {
        self.zoom = MIN_ZOOM;
        self.pan = 0.0;
    }

    /// The visible sample range of a buffer with `len` frames.
    pub fn visible(&self, len: usize) -> SampleWindow {
        let len = len as f64;
        SampleWindow {
            start: (self.pan.clamp(0.0, max_pan(self.zoom)) * len).floor(),
            length: len / self.zoom,
        }
    }

    /// Zoom as shown next to the zoom slider, such as "4.0x".
    pub fn zoom_label(&self) -> String {
        format!("{:.1}x", self.zoom)
    }

    /// Pan as a whole percentage.
    pub fn pan_percent(&self) -> u32 {
        (self.pan * 100.0).round() as u32
    }
}

/// A run of frames shown across the raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    /// First visible frame.
    pub start: f64,
    /// Number of visible frames. May be fractional.
    pub length: f64,
}

impl SampleWindow {
    /// One past the last visible frame.
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    /// Maps a frame position to an x coordinate on a raster `width` columns wide. The result
    /// is outside `[0, width)` when the frame isn't visible.
    pub fn x_of(&self, frame: f64, width: usize) -> f64 {
        if self.length <= 0.0 {
            return f64::NAN;
        }
        (frame - self.start) / self.length * width as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_visible_window() {
        let mut view = ViewWindow::default();
        view.set_zoom(4.0);
        view.set_pan(0.2);
        let window = view.visible(100_000);
        assert_eq!(20_000.0, window.start);
        assert_eq!(25_000.0, window.length);
        assert_eq!(45_000.0, window.end());
    }

    #[test]
    fn test_zoom_clamps() {
        let mut view = ViewWindow::default();
        view.set_zoom(0.25);
        assert_eq!(1.0, view.zoom());
        view.set_zoom(100.0);
        assert_eq!(40.0, view.zoom());
        view.set_zoom(f64::NAN);
        assert_eq!(40.0, view.zoom());

        let mut view = ViewWindow::new(8.0);
        view.set_zoom(10.0);
        assert_eq!(8.0, view.zoom());
    }

    #[test]
    fn test_pan_clamps_to_zoom() {
        let mut view = ViewWindow::default();
        view.set_pan(0.5);
        assert_eq!(0.0, view.pan());

        view.set_zoom(2.0);
        view.set_pan(0.9);
        assert_eq!(0.5, view.pan());

        // Zooming out pulls the pan back.
        view.set_zoom(1.25);
        assert!((view.pan() - 0.2).abs() < 1e-12);
        view.set_zoom(1.0);
        assert_eq!(0.0, view.pan());
    }

    #[test]
    fn test_labels() {
        let mut view = ViewWindow::default();
        view.set_zoom(4.0);
        view.set_pan(0.456);
        assert_eq!("4.0x", view.zoom_label());
        assert_eq!(46, view.pan_percent());
    }

    #[test]
    fn test_x_of() {
        let window = SampleWindow {
            start: 1000.0,
            length: 500.0,
        };
        assert_eq!(0.0, window.x_of(1000.0, 100));
        assert_eq!(50.0, window.x_of(1250.0, 100));
        assert!(window.x_of(900.0, 100) < 0.0);
        assert!(window.x_of(1600.0, 100) >= 100.0);
    }
}
