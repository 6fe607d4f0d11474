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
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{
    bank::{PadBank, PadId, PadSource},
    clips::{ClipStore, ClipUri},
    PadError,
};
use crate::audio::{
    AudioBuffer, Device, Owner, PlayRequest, PlaybackEnd, PlaybackError, Transport,
};

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// The pad was already sounding and has been silenced.
    Stopped,
}

/// Routes pad presses to the bank and owns the transport all sound goes through, so at
/// most one pad, or the editor preview, is ever audible.
pub struct TriggerController {
    transport: Transport,
    bank: PadBank,
    clips: ClipStore,
}

impl TriggerController {
    pub fn new(device: Arc<dyn Device>, bank: PadBank, clips: ClipStore) -> TriggerController {
        TriggerController {
            transport: Transport::new(device),
            bank,
            clips,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    pub fn bank(&self) -> &PadBank {
        &self.bank
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    pub fn clips_mut(&mut self) -> &mut ClipStore {
        &mut self.clips
    }

    /// Presses a pad. Pressing the sounding pad silences it. Otherwise whatever is sounding
    /// is stopped and the pad starts from its first frame with its own loop flag and rate.
    /// A pad with no playable source leaves whatever is sounding untouched. If the device
    /// refuses to play, nothing is left active.
    pub fn trigger(&mut self, id: PadId) -> Result<TriggerOutcome, PadError> {
        if self.transport.stop_owner(Owner::Pad(id)) {
            debug!(pad = %id, "Pad stopped");
            return Ok(TriggerOutcome::Stopped);
        }

        let slot = self.bank.get(id).clone();
        let buffer = self.open_source(id)?;
        self.transport.stop();
        let request = PlayRequest::whole(buffer, slot.is_looping(), slot.rate())
            .with_label(slot.label());
        if let Err(e) = self.transport.start(Owner::Pad(id), request) {
            warn!(pad = %id, err = %e, "Could not play pad");
            return Err(e.into());
        }

        debug!(
            pad = %id,
            label = %slot.label(),
            looping = slot.is_looping(),
            rate = slot.rate(),
            "Pad triggered"
        );
        Ok(TriggerOutcome::Started)
    }

    fn open_source(&mut self, id: PadId) -> Result<Arc<AudioBuffer>, PadError> {
        let slot = self.bank.get(id);
        let buffer = match slot.source() {
            PadSource::BuiltIn(number) => self.clips.beat(*number),
            PadSource::Clip(uri) => match self.clips.open(uri) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    warn!(pad = %id, uri = %uri, err = %e, "Could not open clip");
                    None
                }
            },
        };
        buffer.ok_or_else(|| {
            warn!(pad = %id, "Could not play pad");
            PadError::Playback(PlaybackError::NoSource(slot.label()))
        })
    }

    /// Sets a pad's rate, clamped to [0.5, 1.5], and returns the stored value. The sounding
    /// pad changes speed immediately.
    pub fn set_speed(&mut self, id: PadId, rate: f64) -> f64 {
        let rate = self.bank.set_rate(id, rate);
        if let Some(handle) = self.transport.handle_for(Owner::Pad(id)) {
            handle.set_rate(rate);
        }
        debug!(pad = %id, rate, "Pad speed set");
        rate
    }

    /// Gives a pad a new clip. A pad that is sounding keeps playing its old sound; the new
    /// clip is used from the next trigger.
    pub fn assign_source(
        &mut self,
        id: PadId,
        uri: ClipUri,
        looping: bool,
        display_name: Option<String>,
    ) {
        info!(pad = %id, uri = %uri, looping, "Pad assigned");
        self.bank.assign(id, uri, looping, display_name);
    }

    /// The pad currently sounding, if any.
    pub fn active_pad(&self) -> Option<PadId> {
        match self.transport.active_owner() {
            Some(Owner::Pad(id)) => Some(id),
            _ => None,
        }
    }

    /// Releases the active handle if it has ended.
    pub fn poll(&mut self) -> Option<(Owner, PlaybackEnd)> {
        self.transport.poll()
    }

    /// Silences whatever is sounding, pad or preview.
    pub fn stop_all(&mut self) -> Option<Owner> {
        let stopped = self.transport.stop();
        if let Some(owner) = stopped {
            info!(owner = %owner, "Stopped all playback");
        }
        stopped
    }
}
