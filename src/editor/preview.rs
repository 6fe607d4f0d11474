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

use tracing::{info, warn};

use super::region::LoopRegion;
use crate::audio::{AudioBuffer, Owner, PlayRequest, PlaybackError, Transport};

/// Auditions the selected region. The sound itself lives in the [`Transport`], so a
/// preview and a pad can never be heard together.
#[derive(Debug, Default)]
pub struct PreviewPlayer {
    /// Frame count of the buffer being previewed.
    frames: usize,
}

impl PreviewPlayer {
    pub fn new() -> PreviewPlayer {
        PreviewPlayer::default()
    }

    /// Plays the region, looping within it or making a single pass. Any sound already
    /// playing is stopped first. An empty region is refused before anything is stopped.
    pub fn play(
        &mut self,
        transport: &mut Transport,
        buffer: &Arc<AudioBuffer>,
        region: &LoopRegion,
        loop_enabled: bool,
    ) -> Result<(), PlaybackError> {
        let (start_frame, end_frame) = region.frames(buffer.len());
        if region.is_empty() || end_frame <= start_frame {
            return Err(PlaybackError::InvalidRegion {
                start: region.start(),
                end: region.end(),
            });
        }

        let request = PlayRequest::region(buffer.clone(), start_frame, end_frame, loop_enabled)
            .with_label("preview");
        if let Err(e) = transport.start(Owner::Preview, request) {
            warn!(err = %e, "Could not start preview");
            return Err(e);
        }
        self.frames = buffer.len();
        info!(
            start_frame,
            end_frame,
            looping = loop_enabled,
            "Preview started"
        );
        Ok(())
    }

    /// Stops the preview. Returns false if nothing was previewing.
    pub fn stop(&mut self, transport: &mut Transport) -> bool {
        let stopped = transport.stop_owner(Owner::Preview);
        if stopped {
            info!("Preview stopped");
        }
        stopped
    }

    pub fn is_playing(&self, transport: &Transport) -> bool {
        transport
            .handle_for(Owner::Preview)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Moves the loop of a running preview. The new bounds take effect at the next wrap.
    pub fn retarget(&self, transport: &Transport, region: &LoopRegion) {
        if let Some(handle) = transport.handle_for(Owner::Preview) {
            let (start_frame, end_frame) = region.frames(self.frames);
            handle.set_bounds(start_frame, end_frame);
        }
    }

    /// Switches a running preview between looping and a single pass.
    pub fn set_looping(&self, transport: &Transport, looping: bool) {
        if let Some(handle) = transport.handle_for(Owner::Preview) {
            handle.set_looping(looping);
        }
    }

    /// The playhead as a fraction of the whole buffer, while a preview is sounding.
    pub fn playhead(&self, transport: &Transport) -> Option<f64> {
        let handle = transport.handle_for(Owner::Preview)?;
        if handle.is_finished() || self.frames == 0 {
            return None;
        }
        Some(handle.position() / self.frames as f64)
    }
}
