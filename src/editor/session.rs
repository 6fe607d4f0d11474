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

use super::{
    extract::{extract, EncodedClip},
    preview::PreviewPlayer,
    region::{Handle, LoopRegion, RegionSelector},
    timefield::TimePart,
    view::{ViewWindow, DEFAULT_MAX_ZOOM},
    waveform::{render, Raster, RasterSize},
    EditorError,
};
use crate::audio::{decode, AudioBuffer, DecodeError, Transport};
use crate::pads::PadId;

/// Editor behaviour that comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    pub max_zoom: f64,
    pub raster: RasterSize,
    /// Whether previews loop when a file is first loaded.
    pub loop_enabled: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            max_zoom: DEFAULT_MAX_ZOOM,
            raster: RasterSize {
                width: 1000,
                height: 150,
            },
            loop_enabled: true,
        }
    }
}

struct LoadedAudio {
    name: String,
    buffer: Arc<AudioBuffer>,
    selector: RegionSelector,
}

/// State of one open editor: the uploaded buffer, its loop region, the view and the
/// preview. Operations that make sound take the shared [`Transport`].
pub struct EditorSession {
    settings: EditorSettings,
    audio: Option<LoadedAudio>,
    view: ViewWindow,
    loop_enabled: bool,
    selected_pad: PadId,
    last_error: Option<String>,
    preview: PreviewPlayer,
}

impl EditorSession {
    pub fn new(settings: EditorSettings) -> EditorSession {
        EditorSession {
            settings,
            audio: None,
            view: ViewWindow::new(settings.max_zoom),
            loop_enabled: settings.loop_enabled,
            selected_pad: PadId::FIRST,
            last_error: None,
            preview: PreviewPlayer::new(),
        }
    }

    /// Decodes an uploaded file and makes it the session's audio. All per-upload state is
    /// reset first, so a failed upload leaves an empty editor holding only the error.
    pub fn upload(
        &mut self,
        transport: &mut Transport,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), DecodeError> {
        self.close(transport);

        match decode(bytes) {
            Ok(buffer) => {
                info!(
                    file = name,
                    duration = buffer.duration_secs(),
                    "Loaded file into editor"
                );
                self.audio = Some(LoadedAudio {
                    name: name.to_string(),
                    selector: RegionSelector::new(buffer.duration_secs()),
                    buffer: Arc::new(buffer),
                });
                Ok(())
            }
            Err(e) => {
                warn!(file = name, err = %e, "Could not load file");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Stops the preview and drops everything tied to the current upload.
    pub fn close(&mut self, transport: &mut Transport) {
        self.preview.stop(transport);
        self.audio = None;
        self.view.reset();
        self.loop_enabled = self.settings.loop_enabled;
        self.selected_pad = PadId::FIRST;
        self.last_error = None;
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.audio.as_ref().map(|audio| &audio.buffer)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.audio.as_ref().map(|audio| audio.name.as_str())
    }

    pub fn region(&self) -> Option<LoopRegion> {
        self.audio.as_ref().map(|audio| audio.selector.region())
    }

    pub fn selector(&self) -> Option<&RegionSelector> {
        self.audio.as_ref().map(|audio| &audio.selector)
    }

    pub fn view(&self) -> &ViewWindow {
        &self.view
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn selected_pad(&self) -> PadId {
        self.selected_pad
    }

    /// The last upload error, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn audio(&self) -> Result<&LoadedAudio, EditorError> {
        self.audio.as_ref().ok_or(EditorError::NoAudio)
    }

    fn selector_mut(&mut self) -> Result<&mut RegionSelector, EditorError> {
        self.audio
            .as_mut()
            .map(|audio| &mut audio.selector)
            .ok_or(EditorError::NoAudio)
    }

    /// Renders the waveform with the live playhead.
    pub fn render_frame(&self, transport: &Transport) -> Result<Raster, EditorError> {
        let audio = self.audio()?;
        Ok(render(
            &audio.buffer,
            &self.view,
            &audio.selector.region(),
            self.playhead(transport),
            self.settings.raster,
        ))
    }

    /// Moves a handle from a drag or slider. A running preview follows the new region.
    pub fn drag_handle(
        &mut self,
        transport: &Transport,
        handle: Handle,
        fraction: f64,
    ) -> Result<(), EditorError> {
        self.selector_mut()?.drag(handle, fraction);
        self.follow_region(transport);
        Ok(())
    }

    /// Moves a handle by a signed number of milliseconds, as the arrow keys do.
    pub fn nudge_handle(
        &mut self,
        transport: &Transport,
        handle: Handle,
        millis: i64,
    ) -> Result<(), EditorError> {
        self.selector_mut()?.nudge(handle, millis);
        self.follow_region(transport);
        Ok(())
    }

    /// Stores typed text for a time field. Nothing moves until the field is committed.
    pub fn set_time_field(
        &mut self,
        handle: Handle,
        part: TimePart,
        text: &str,
    ) -> Result<(), EditorError> {
        self.selector_mut()?.set_field(handle, part, text);
        Ok(())
    }

    /// Applies the typed fields of a handle, as on blur or Enter.
    pub fn commit_time_field(
        &mut self,
        transport: &Transport,
        handle: Handle,
    ) -> Result<(), EditorError> {
        self.selector_mut()?.commit(handle);
        self.follow_region(transport);
        Ok(())
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.view.set_zoom(zoom);
    }

    pub fn set_pan(&mut self, pan: f64) {
        self.view.set_pan(pan);
    }

    pub fn preview_play(&mut self, transport: &mut Transport) -> Result<(), EditorError> {
        let audio = self.audio.as_ref().ok_or(EditorError::NoAudio)?;
        let region = audio.selector.region();
        self.preview
            .play(transport, &audio.buffer, &region, self.loop_enabled)?;
        Ok(())
    }

    /// Stops the preview. Stopping twice is harmless.
    pub fn preview_stop(&mut self, transport: &mut Transport) -> bool {
        self.preview.stop(transport)
    }

    pub fn is_previewing(&self, transport: &Transport) -> bool {
        self.preview.is_playing(transport)
    }

    /// Sets whether previews loop. A running preview switches immediately.
    pub fn set_loop_enabled(&mut self, transport: &Transport, enabled: bool) {
        self.loop_enabled = enabled;
        self.preview.set_looping(transport, enabled);
    }

    /// Chooses the pad the next save goes to.
    pub fn select_pad(&mut self, pad: PadId) {
        self.selected_pad = pad;
    }

    /// The preview playhead as a fraction of the buffer, while a preview is sounding.
    pub fn playhead(&self, transport: &Transport) -> Option<f64> {
        self.preview.playhead(transport)
    }

    /// Stops the preview and encodes the selected region.
    pub fn extract(&mut self, transport: &mut Transport) -> Result<EncodedClip, EditorError> {
        self.preview.stop(transport);
        let audio = self.audio()?;
        Ok(extract(&audio.buffer, &audio.selector.region())?)
    }

    fn follow_region(&self, transport: &Transport) {
        if let Some(region) = self.region() {
            self.preview.retarget(transport, &region);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::mock;
    use crate::editor::{Cell, ExtractError, TimeParts};
    use crate::testutil::wav_bytes;

    fn setup() -> (Arc<mock::Device>, Transport, EditorSession) {
        let device = Arc::new(mock::Device::get("mock-session"));
        let transport = Transport::new(device.clone());
        let session = EditorSession::new(EditorSettings {
            raster: RasterSize {
                width: 20,
                height: 5,
            },
            ..EditorSettings::default()
        });
        (device, transport, session)
    }

    fn ten_seconds() -> Vec<u8> {
        wav_bytes(&[vec![1000_i16; 441_000]], 44100, 16)
    }

    #[test]
    fn test_upload_resets_state() {
        let (_device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session
            .drag_handle(&transport, Handle::Start, 0.3)
            .expect("drag");
        session.set_zoom(4.0);
        session.set_pan(0.5);
        session.select_pad(PadId::new(5).expect("pad"));
        session.set_loop_enabled(&transport, false);

        session
            .upload(&mut transport, "b.wav", &ten_seconds())
            .expect("upload");
        assert_eq!(Some(LoopRegion::default()), session.region());
        assert_eq!(1.0, session.view().zoom());
        assert_eq!(0.0, session.view().pan());
        assert_eq!(PadId::FIRST, session.selected_pad());
        assert!(session.loop_enabled());
        assert_eq!(Some("b.wav"), session.file_name());
    }

    #[test]
    fn test_failed_upload_clears_everything() {
        let (_device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session.preview_play(&mut transport).expect("preview");

        let result = session.upload(&mut transport, "song.mp3", b"ID3\x03\x00\x00\x00");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat(_))));
        assert!(session.buffer().is_none());
        assert!(session.region().is_none());
        assert!(session.last_error().is_some());
        assert_eq!(None, transport.active_owner());
        assert!(matches!(
            session.render_frame(&transport),
            Err(EditorError::NoAudio)
        ));
    }

    #[test]
    fn test_typed_region_and_extract() {
        let (_device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session
            .set_time_field(Handle::End, TimePart::Seconds, "04")
            .expect("field");
        session
            .commit_time_field(&transport, Handle::End)
            .expect("commit");
        session
            .set_time_field(Handle::Start, TimePart::Seconds, "2")
            .expect("field");
        session
            .commit_time_field(&transport, Handle::Start)
            .expect("commit");
        assert_eq!(Some(LoopRegion::new(0.2, 0.4)), session.region());
        assert_eq!(
            TimeParts::new(0, 2, 0),
            session.selector().expect("selector").time(Handle::Start)
        );

        let clip = session.extract(&mut transport).expect("extract");
        assert_eq!(88200, clip.frames());
    }

    #[test]
    fn test_extract_empty_selection() {
        let (_device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session
            .drag_handle(&transport, Handle::End, 0.0)
            .expect("drag");
        assert!(matches!(
            session.extract(&mut transport),
            Err(EditorError::Extract(ExtractError::EmptySelection))
        ));
        assert!(matches!(
            session.preview_play(&mut transport),
            Err(EditorError::Playback(_))
        ));
    }

    #[test]
    fn test_extract_stops_preview() {
        let (_device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session.preview_play(&mut transport).expect("preview");
        assert!(session.is_previewing(&transport));
        session.extract(&mut transport).expect("extract");
        assert!(!session.is_previewing(&transport));
    }

    #[test]
    fn test_render_frame_shows_playhead() {
        let (device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session.preview_play(&mut transport).expect("preview");
        device.advance(44100 * 5);

        let raster = session.render_frame(&transport).expect("frame");
        assert_eq!(vec![10], raster.columns_with(Cell::PLAYHEAD));

        session.preview_stop(&mut transport);
        assert!(!session.preview_stop(&mut transport));
        let raster = session.render_frame(&transport).expect("frame");
        assert!(raster.columns_with(Cell::PLAYHEAD).is_empty());
    }

    #[test]
    fn test_loop_toggle_applies_to_running_preview() {
        let (device, mut transport, mut session) = setup();
        session
            .upload(&mut transport, "a.wav", &ten_seconds())
            .expect("upload");
        session
            .drag_handle(&transport, Handle::End, 0.01)
            .expect("drag");
        session.preview_play(&mut transport).expect("preview");
        device.advance(10_000);
        assert!(session.is_previewing(&transport));

        session.set_loop_enabled(&transport, false);
        device.advance(10_000);
        assert!(!session.is_previewing(&transport));
    }

    #[test]
    fn test_operations_without_audio() {
        let (_device, mut transport, mut session) = setup();
        assert!(matches!(
            session.drag_handle(&transport, Handle::Start, 0.5),
            Err(EditorError::NoAudio)
        ));
        assert!(matches!(
            session.preview_play(&mut transport),
            Err(EditorError::NoAudio)
        ));
        assert!(!session.preview_stop(&mut transport));
        session.set_zoom(2.0);
        assert_eq!(2.0, session.view().zoom());
    }
}
