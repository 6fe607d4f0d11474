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
use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use super::{Device, PlayRequest, PlaybackEnd, PlaybackError, PlaybackHandle};
use crate::pads::PadId;

/// Who started the sound that is currently audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Preview,
    Pad(PadId),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Preview => write!(f, "preview"),
            Owner::Pad(pad) => write!(f, "pad {}", pad),
        }
    }
}

/// The single sounding handle and who owns it.
#[derive(Debug)]
pub struct ActiveHandle {
    owner: Owner,
    handle: PlaybackHandle,
}

impl ActiveHandle {
    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn handle(&self) -> &PlaybackHandle {
        &self.handle
    }
}

/// Schedules every sound through one device and keeps at most one of them audible.
/// The previous sound is always stopped before the next one is started.
pub struct Transport {
    device: Arc<dyn Device>,
    active: Option<ActiveHandle>,
}

impl Transport {
    pub fn new(device: Arc<dyn Device>) -> Transport {
        Transport {
            device,
            active: None,
        }
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Stops whatever is sounding, then starts the request for the given owner. When the
    /// device refuses, nothing is left active.
    pub fn start(&mut self, owner: Owner, request: PlayRequest) -> Result<(), PlaybackError> {
        self.stop();
        let handle = self.device.play(request)?;
        debug!(owner = %owner, id = handle.id(), "Handle started");
        self.active = Some(ActiveHandle { owner, handle });
        Ok(())
    }

    /// Stops the active handle, if any, and returns its owner. Calling this again is a no-op.
    pub fn stop(&mut self) -> Option<Owner> {
        let active = self.active.take()?;
        self.device.stop(&active.handle);
        debug!(owner = %active.owner, id = active.handle.id(), "Handle stopped");
        Some(active.owner)
    }

    /// Stops the active handle only if it belongs to the given owner.
    pub fn stop_owner(&mut self, owner: Owner) -> bool {
        if self.active_owner() == Some(owner) {
            self.stop();
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<&ActiveHandle> {
        self.active.as_ref()
    }

    pub fn active_owner(&self) -> Option<Owner> {
        self.active.as_ref().map(|active| active.owner)
    }

    /// The live handle, if the given owner holds it.
    pub fn handle_for(&self, owner: Owner) -> Option<&PlaybackHandle> {
        self.active
            .as_ref()
            .filter(|active| active.owner == owner)
            .map(|active| &active.handle)
    }

    /// Checks the active handle's completion channel. A handle that has ended is released
    /// and its owner returned with how it ended. A failed device ends its handle as stopped.
    pub fn poll(&mut self) -> Option<(Owner, PlaybackEnd)> {
        let active = self.active.as_ref()?;
        let end = match active.handle.try_ended() {
            Some(end) => end,
            None if self.device.is_failed() => {
                warn!(
                    device = %self.device,
                    owner = %active.owner,
                    "Output failed, releasing handle"
                );
                self.device.stop(&active.handle);
                PlaybackEnd::Stopped
            }
            None => return None,
        };
        let active = self.active.take()?;
        debug!(owner = %active.owner, id = active.handle.id(), end = ?end, "Handle ended");
        Some((active.owner, end))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{mock, mock::DeviceEvent, AudioBuffer};

    fn setup() -> (Arc<mock::Device>, Transport) {
        let device = Arc::new(mock::Device::get("mock-transport"));
        let transport = Transport::new(device.clone());
        (device, transport)
    }

    fn clip(frames: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(44100, vec![vec![0.25; frames]]).expect("buffer"))
    }

    fn pad(id: u8) -> Owner {
        Owner::Pad(PadId::new(id).expect("pad"))
    }

    #[test]
    fn test_start_stops_previous_first() {
        let (device, mut transport) = setup();
        transport
            .start(pad(1), PlayRequest::whole(clip(100), true, 1.0))
            .expect("pad 1");
        let first = transport.active().expect("active").handle().id();

        transport
            .start(pad(3), PlayRequest::whole(clip(100), true, 1.0))
            .expect("pad 3");
        let second = transport.active().expect("active").handle().id();

        let events = device.events();
        assert_eq!(3, events.len());
        assert!(matches!(events[0], DeviceEvent::Play { id, .. } if id == first));
        assert_eq!(DeviceEvent::Stop { id: first }, events[1]);
        assert!(matches!(events[2], DeviceEvent::Play { id, .. } if id == second));

        device.advance(10);
        assert_eq!(1, device.active_voices());
        assert_eq!(Some(pad(3)), transport.active_owner());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (device, mut transport) = setup();
        transport
            .start(Owner::Preview, PlayRequest::whole(clip(100), true, 1.0))
            .expect("preview");
        assert_eq!(Some(Owner::Preview), transport.stop());
        assert_eq!(None, transport.stop());
        assert_eq!(2, device.events().len());
    }

    #[test]
    fn test_rejected_start_leaves_nothing_active() {
        let (device, mut transport) = setup();
        transport
            .start(pad(1), PlayRequest::whole(clip(100), true, 1.0))
            .expect("pad 1");
        device.reject_next("locked");

        let result = transport.start(pad(2), PlayRequest::whole(clip(100), true, 1.0));
        assert!(matches!(result, Err(PlaybackError::Rejected(_))));
        assert_eq!(None, transport.active_owner());
        device.advance(1);
        assert_eq!(0, device.active_voices());
    }

    #[test]
    fn test_poll_releases_finished_handle() {
        let (device, mut transport) = setup();
        transport
            .start(pad(2), PlayRequest::whole(clip(100), false, 1.0))
            .expect("pad 2");
        assert_eq!(None, transport.poll());

        device.advance(200);
        assert_eq!(Some((pad(2), PlaybackEnd::Finished)), transport.poll());
        assert_eq!(None, transport.active_owner());
        assert_eq!(None, transport.poll());
    }

    #[test]
    fn test_failed_device_releases_looping_handle() {
        let (device, mut transport) = setup();
        transport
            .start(pad(1), PlayRequest::whole(clip(100), true, 1.0))
            .expect("pad 1");
        assert_eq!(None, transport.poll());

        device.fail();
        assert_eq!(Some((pad(1), PlaybackEnd::Stopped)), transport.poll());
        assert_eq!(None, transport.active_owner());
        assert_eq!(None, transport.poll());

        let result = transport.start(pad(2), PlayRequest::whole(clip(100), true, 1.0));
        assert!(matches!(result, Err(PlaybackError::Rejected(_))));
        assert_eq!(None, transport.active_owner());
    }

    #[test]
    fn test_stop_owner_only_matches_owner() {
        let (_device, mut transport) = setup();
        transport
            .start(pad(4), PlayRequest::whole(clip(100), true, 1.0))
            .expect("pad 4");
        assert!(!transport.stop_owner(Owner::Preview));
        assert!(transport.handle_for(pad(4)).is_some());
        assert!(transport.stop_owner(pad(4)));
        assert!(transport.handle_for(pad(4)).is_none());
    }
}
