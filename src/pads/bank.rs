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

use super::{clips::ClipUri, PadError};

/// Number of pads in the bank.
pub const PAD_COUNT: u8 = 8;

pub const MIN_RATE: f64 = 0.5;
pub const MAX_RATE: f64 = 1.5;
pub const DEFAULT_RATE: f64 = 1.0;

/// Clamps a playback rate into the supported range. NaN is refused.
pub fn clamp_rate(rate: f64) -> Option<f64> {
    if rate.is_nan() {
        return None;
    }
    Some(rate.clamp(MIN_RATE, MAX_RATE))
}

/// A pad number, 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadId(u8);

impl PadId {
    pub const FIRST: PadId = PadId(1);

    pub fn new(id: u8) -> Result<PadId, PadError> {
        if (1..=PAD_COUNT).contains(&id) {
            Ok(PadId(id))
        } else {
            Err(PadError::InvalidPad(id))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Every pad, in order.
    pub fn all() -> impl Iterator<Item = PadId> {
        (1..=PAD_COUNT).map(PadId)
    }
}

impl fmt::Display for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a pad's sound comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadSource {
    /// The built-in beat with the pad's number.
    BuiltIn(u8),
    /// A clip saved from the editor.
    Clip(ClipUri),
}

/// One pad's assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct PadSlot {
    id: PadId,
    source: PadSource,
    looping: bool,
    rate: f64,
    display_name: Option<String>,
}

impl PadSlot {
    fn new(id: PadId, rate: f64) -> PadSlot {
        PadSlot {
            id,
            source: PadSource::BuiltIn(id.get()),
            looping: true,
            rate,
            display_name: None,
        }
    }

    pub fn id(&self) -> PadId {
        self.id
    }

    pub fn source(&self) -> &PadSource {
        &self.source
    }

    /// The saved clip, or None while the pad plays its built-in beat.
    pub fn source_uri(&self) -> Option<&ClipUri> {
        match &self.source {
            PadSource::Clip(uri) => Some(uri),
            PadSource::BuiltIn(_) => None,
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// The name shown on the pad.
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => format!("Beat {}", self.id),
        }
    }
}

/// The eight pads. Slots are reassigned, never removed.
#[derive(Debug, Clone)]
pub struct PadBank {
    slots: Vec<PadSlot>,
}

impl Default for PadBank {
    fn default() -> Self {
        PadBank::new(DEFAULT_RATE)
    }
}

impl PadBank {
    /// Creates a bank of built-in looping beats at the given rate.
    pub fn new(default_rate: f64) -> PadBank {
        let rate = clamp_rate(default_rate).unwrap_or(DEFAULT_RATE);
        PadBank {
            slots: PadId::all().map(|id| PadSlot::new(id, rate)).collect(),
        }
    }

    pub fn get(&self, id: PadId) -> &PadSlot {
        &self.slots[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PadSlot> {
        self.slots.iter()
    }

    /// Replaces a pad's source, loop flag and name. The rate is kept.
    pub fn assign(&mut self, id: PadId, uri: ClipUri, looping: bool, display_name: Option<String>) {
        let slot = &mut self.slots[id.index()];
        slot.source = PadSource::Clip(uri);
        slot.looping = looping;
        slot.display_name = display_name;
    }

    /// Stores a clamped rate and returns it. NaN leaves the pad unchanged.
    pub fn set_rate(&mut self, id: PadId, rate: f64) -> f64 {
        let slot = &mut self.slots[id.index()];
        if let Some(rate) = clamp_rate(rate) {
            slot.rate = rate;
        }
        slot.rate
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pad(id: u8) -> PadId {
        PadId::new(id).expect("pad")
    }

    #[test]
    fn test_pad_ids() {
        assert!(PadId::new(0).is_err());
        assert!(PadId::new(9).is_err());
        assert_eq!(8, PadId::all().count());
        assert_eq!(3, pad(3).get());
        assert_eq!("3", pad(3).to_string());
    }

    #[test]
    fn test_default_bank() {
        let bank = PadBank::default();
        for (slot, n) in bank.iter().zip(1..) {
            assert_eq!(n, slot.id().get());
            assert_eq!(&PadSource::BuiltIn(n), slot.source());
            assert_eq!(None, slot.source_uri());
            assert!(slot.is_looping());
            assert_eq!(1.0, slot.rate());
            assert_eq!(format!("Beat {}", n), slot.label());
        }
    }

    #[test]
    fn test_rate_clamp() {
        let mut bank = PadBank::default();
        assert_eq!(1.5, bank.set_rate(pad(2), 5.0));
        assert_eq!(0.5, bank.set_rate(pad(2), -1.0));
        assert_eq!(1.25, bank.set_rate(pad(2), 1.25));
        assert_eq!(1.25, bank.set_rate(pad(2), f64::NAN));
        assert_eq!(1.5, bank.set_rate(pad(2), f64::INFINITY));
        assert_eq!(1.0, bank.get(pad(3)).rate());
    }

    #[test]
    fn test_assign_keeps_rate() {
        let mut bank = PadBank::default();
        bank.set_rate(pad(4), 0.75);
        bank.assign(pad(4), ClipUri::new(7), false, Some("vocal.wav".into()));

        let slot = bank.get(pad(4));
        assert_eq!(Some(&ClipUri::new(7)), slot.source_uri());
        assert!(!slot.is_looping());
        assert_eq!(0.75, slot.rate());
        assert_eq!("vocal.wav", slot.label());
    }

    #[test]
    fn test_default_rate_is_clamped() {
        let bank = PadBank::new(3.0);
        assert!(bank.iter().all(|slot| slot.rate() == 1.5));
    }
}
