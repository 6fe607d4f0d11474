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
use std::fmt;

use super::timefield::{TimeFieldText, TimePart, TimeParts};

/// One of the two loop handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Start,
    End,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Start => write!(f, "start"),
            Handle::End => write!(f, "end"),
        }
    }
}

fn clamp_unit(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// A loop as fractions of the buffer length. Always `0 <= start <= end <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    start: f64,
    end: f64,
}

impl Default for LoopRegion {
    fn default() -> Self {
        LoopRegion {
            start: 0.0,
            end: 1.0,
        }
    }
}

impl LoopRegion {
    /// Creates a region, clamping both ends and pinning the end to the start if they cross.
    pub fn new(start: f64, end: f64) -> LoopRegion {
        let start = clamp_unit(start);
        LoopRegion {
            start,
            end: clamp_unit(end).max(start),
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn get(&self, handle: Handle) -> f64 {
        match handle {
            Handle::Start => self.start,
            Handle::End => self.end,
        }
    }

    /// True when the region selects nothing.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Moves one handle. The position is clamped to [0, 1]; if it crosses the other handle,
    /// the other handle is moved along with it.
    pub fn set(&mut self, handle: Handle, fraction: f64) {
        let fraction = clamp_unit(fraction);
        match handle {
            Handle::Start => {
                self.start = fraction;
                self.end = self.end.max(fraction);
            }
            Handle::End => {
                self.end = fraction;
                self.start = self.start.min(fraction);
            }
        }
    }

    /// The frame range `[floor(start * len), floor(end * len))`.
    pub fn frames(&self, len: usize) -> (usize, usize) {
        let len_f = len as f64;
        let start = ((self.start * len_f).floor() as usize).min(len);
        let end = ((self.end * len_f).floor() as usize).min(len);
        (start, end)
    }
}

/// Owns the loop region of an uploaded buffer and the time fields shown for each handle.
/// Every change goes through here so the fields never disagree with the region.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    region: LoopRegion,
    duration: f64,
    start_fields: TimeFieldText,
    end_fields: TimeFieldText,
}

impl RegionSelector {
    /// Creates a selector spanning the whole buffer. `duration` is in seconds.
    pub fn new(duration: f64) -> RegionSelector {
        let mut selector = RegionSelector {
            region: LoopRegion::default(),
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
            start_fields: TimeFieldText::default(),
            end_fields: TimeFieldText::default(),
        };
        selector.refresh_fields();
        selector
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Puts both handles back at the ends of the buffer.
    pub fn reset(&mut self) {
        self.region = LoopRegion::default();
        self.refresh_fields();
    }

    /// Moves a handle to a pointer or slider position given as a fraction of the buffer.
    pub fn drag(&mut self, handle: Handle, fraction: f64) {
        self.region.set(handle, fraction);
        self.refresh_fields();
    }

    /// Moves a handle by a signed number of milliseconds.
    pub fn nudge(&mut self, handle: Handle, millis: i64) {
        if self.duration <= 0.0 {
            return;
        }
        let delta = millis as f64 / 1000.0 / self.duration;
        self.drag(handle, self.region.get(handle) + delta);
    }

    /// Moves a handle to a time given as minutes, seconds and milliseconds.
    pub fn set_from_time(&mut self, handle: Handle, parts: TimeParts) {
        let fraction = if self.duration > 0.0 {
            parts.to_seconds() / self.duration
        } else {
            0.0
        };
        self.drag(handle, fraction);
    }

    /// The canonical parts for a handle's current position.
    pub fn time(&self, handle: Handle) -> TimeParts {
        TimeParts::from_seconds(self.region.get(handle) * self.duration)
    }

    /// Current text of one field, as typed or as last refreshed.
    pub fn field(&self, handle: Handle, part: TimePart) -> &str {
        self.fields(handle).get(part)
    }

    /// Stores typed text without touching the region.
    pub fn set_field(&mut self, handle: Handle, part: TimePart, text: &str) {
        self.fields_mut(handle).set(part, text);
    }

    /// Applies the typed fields of a handle. Fields that still describe the current
    /// position leave the region exactly as it is.
    pub fn commit(&mut self, handle: Handle) {
        let typed = self.fields(handle).parts();
        if typed != self.time(handle) {
            self.set_from_time(handle, typed);
        } else {
            self.refresh_fields();
        }
    }

    fn fields(&self, handle: Handle) -> &TimeFieldText {
        match handle {
            Handle::Start => &self.start_fields,
            Handle::End => &self.end_fields,
        }
    }

    fn fields_mut(&mut self, handle: Handle) -> &mut TimeFieldText {
        match handle {
            Handle::Start => &mut self.start_fields,
            Handle::End => &mut self.end_fields,
        }
    }

    fn refresh_fields(&mut self) {
        self.start_fields = TimeFieldText::from_parts(&self.time(Handle::Start));
        self.end_fields = TimeFieldText::from_parts(&self.time(Handle::End));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_drag_pins_other_handle() {
        for i in 0..=100 {
            let x = i as f64 / 100.0;
            let mut region = LoopRegion::default();
            region.set(Handle::Start, x);
            region.set(Handle::End, x - 1e-9);
            let pinned = (x - 1e-9).max(0.0);
            assert_eq!(pinned, region.start(), "x = {}", x);
            assert_eq!(region.start(), region.end(), "x = {}", x);
        }
    }

    #[test]
    fn test_drag_start_past_end_raises_end() {
        let mut region = LoopRegion::new(0.2, 0.4);
        region.set(Handle::Start, 0.7);
        assert_eq!(LoopRegion::new(0.7, 0.7), region);
    }

    #[test]
    fn test_drag_clamps() {
        let mut region = LoopRegion::default();
        region.set(Handle::End, 3.0);
        region.set(Handle::Start, -2.0);
        assert_eq!(LoopRegion::default(), region);
        region.set(Handle::Start, f64::NAN);
        assert_eq!(0.0, region.start());
    }

    #[test]
    fn test_new_orders_ends() {
        let region = LoopRegion::new(0.8, 0.3);
        assert_eq!(0.8, region.start());
        assert_eq!(0.8, region.end());
        assert!(region.is_empty());
    }

    #[test]
    fn test_frames() {
        let region = LoopRegion::new(0.2, 0.4);
        assert_eq!((88200, 176400), region.frames(441000));
        assert_eq!((0, 0), LoopRegion::new(0.0, 0.0).frames(10));
        assert_eq!((0, 10), LoopRegion::default().frames(10));
    }

    #[test]
    fn test_set_from_time() {
        let mut selector = RegionSelector::new(10.0);
        selector.set_from_time(Handle::Start, TimeParts::new(0, 2, 0));
        selector.set_from_time(Handle::End, TimeParts::new(0, 4, 0));
        assert_eq!(LoopRegion::new(0.2, 0.4), selector.region());

        // Past the end of the buffer.
        selector.set_from_time(Handle::End, TimeParts::new(5, 0, 0));
        assert_eq!(1.0, selector.region().end());

        // Before the start pins the start.
        selector.set_from_time(Handle::End, TimeParts::new(0, 1, 0));
        assert_eq!(LoopRegion::new(0.1, 0.1), selector.region());
    }

    #[test]
    fn test_typed_fields_commit() {
        let mut selector = RegionSelector::new(10.0);
        assert_eq!("10", selector.field(Handle::End, TimePart::Seconds));

        selector.set_field(Handle::Start, TimePart::Seconds, "2");
        // Not applied until committed.
        assert_eq!(0.0, selector.region().start());
        selector.commit(Handle::Start);
        assert_eq!(0.2, selector.region().start());
        assert_eq!("02", selector.field(Handle::Start, TimePart::Seconds));

        selector.set_field(Handle::Start, TimePart::Millis, "abc");
        selector.commit(Handle::Start);
        assert_eq!(0.2, selector.region().start());
        assert_eq!("000", selector.field(Handle::Start, TimePart::Millis));
    }

    #[test]
    fn test_unchanged_commit_does_not_drift() {
        let mut selector = RegionSelector::new(7.3);
        selector.drag(Handle::Start, 0.123_456_789);
        selector.drag(Handle::End, 0.876_543_21);
        let before = selector.region();

        for _ in 0..10 {
            selector.commit(Handle::Start);
            selector.commit(Handle::End);
        }
        assert_eq!(before, selector.region());
    }

    #[test]
    fn test_time_round_trip() {
        let sample_rate = 44100.0;
        let duration = 10.0;
        let selector = RegionSelector::new(duration);
        for millis in [0_i64, 1, 999, 2000, 3333, 9999, 10000] {
            let f = millis as f64 / 1000.0 / duration;
            let parts = TimeParts::from_seconds(f * selector.duration());
            let back = parts.to_seconds() / selector.duration();
            assert!((back - f).abs() <= 1.0 / sample_rate, "{} ms", millis);
        }
    }

    #[test]
    fn test_nudge() {
        let mut selector = RegionSelector::new(10.0);
        selector.nudge(Handle::Start, 500);
        assert!((selector.region().start() - 0.05).abs() < 1e-12);
        selector.nudge(Handle::Start, -5000);
        assert_eq!(0.0, selector.region().start());
        selector.nudge(Handle::End, 1000);
        assert_eq!(1.0, selector.region().end());
    }

    #[test]
    fn test_reset() {
        let mut selector = RegionSelector::new(10.0);
        selector.drag(Handle::Start, 0.5);
        selector.reset();
        assert_eq!(LoopRegion::default(), selector.region());
        assert_eq!("00", selector.field(Handle::Start, TimePart::Seconds));
    }
}
