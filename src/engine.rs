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
//! The engine ties one editor session and the pad bank to a single audio device. It is the
//! surface a user interface drives.
use std::{error::Error, fmt, sync::Arc};

use tracing::{debug, info};

use crate::audio::{self, Device, Owner};
use crate::config;
use crate::editor::{EditorError, EditorSession, EditorSettings, Handle, Raster, TimePart};
use crate::pads::{ClipStore, PadBank, PadError, PadId, TriggerController, TriggerOutcome};

/// Identifies an open editor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Something that happened without being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A one-shot pad played to its end.
    PadEnded(PadId),
    /// A single-pass preview reached the region end.
    PreviewEnded,
}

pub struct Engine {
    editor_settings: EditorSettings,
    controller: TriggerController,
    editor: Option<(SessionHandle, EditorSession)>,
    next_session: u64,
    events: Vec<EngineEvent>,
}

impl Engine {
    /// Creates an engine playing through the given device. Built-in beats are loaded from
    /// the configured directory.
    pub fn new(config: &config::Engine, device: Arc<dyn Device>) -> Engine {
        let pads = config.pads();
        let mut clips = ClipStore::new();
        if let Some(dir) = pads.beats_dir() {
            let loaded = clips.load_beats(&dir);
            info!(dir = %dir.display(), loaded, "Loaded built-in beats");
        }

        info!(device = %device, "Engine ready");
        Engine {
            editor_settings: config.editor().settings(),
            controller: TriggerController::new(
                device,
                PadBank::new(pads.default_rate()),
                clips,
            ),
            editor: None,
            next_session: 0,
            events: Vec::new(),
        }
    }

    /// Opens the configured audio device and creates an engine around it.
    pub fn from_config(config: &config::Engine) -> Result<Engine, Box<dyn Error>> {
        let device = audio::get_device(&config.audio())?;
        Ok(Engine::new(config, device))
    }

    /// Releases the active handle if it ended on its own and queues the matching event.
    fn pump(&mut self) {
        if let Some((owner, end)) = self.controller.poll() {
            debug!(owner = %owner, end = ?end, "Playback ended");
            self.events.push(match owner {
                Owner::Preview => EngineEvent::PreviewEnded,
                Owner::Pad(id) => EngineEvent::PadEnded(id),
            });
        }
    }

    /// Returns the events since the last call.
    pub fn poll_events(&mut self) -> Vec<EngineEvent> {
        self.pump();
        std::mem::take(&mut self.events)
    }

    /// Opens a fresh editor. An editor that is already open is closed first.
    pub fn open_editor(&mut self) -> SessionHandle {
        if let Some(open) = self.editor.as_ref().map(|(handle, _)| *handle) {
            self.close_editor(open);
        }
        self.next_session += 1;
        let handle = SessionHandle(self.next_session);
        self.editor = Some((handle, EditorSession::new(self.editor_settings)));
        info!(session = %handle, "Editor opened");
        handle
    }

    /// Closes the editor, stopping its preview. Returns false if the handle isn't the open
    /// session.
    pub fn close_editor(&mut self, handle: SessionHandle) -> bool {
        match self.editor.take() {
            Some((open, mut session)) if open == handle => {
                session.close(self.controller.transport_mut());
                info!(session = %handle, "Editor closed");
                true
            }
            other => {
                self.editor = other;
                false
            }
        }
    }

    pub fn editor(&self) -> Option<&EditorSession> {
        self.editor.as_ref().map(|(_, session)| session)
    }

    fn session(&mut self) -> Result<(&mut EditorSession, &mut TriggerController), EditorError> {
        self.pump();
        let Engine {
            editor, controller, ..
        } = self;
        let (_, session) = editor.as_mut().ok_or(EditorError::SessionClosed)?;
        Ok((session, controller))
    }

    /// Loads a file into the editor, replacing whatever was loaded.
    pub fn upload_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.upload(controller.transport_mut(), name, bytes)?;
        Ok(())
    }

    pub fn render_frame(&mut self) -> Result<Raster, EditorError> {
        let (session, controller) = self.session()?;
        session.render_frame(controller.transport())
    }

    pub fn drag_handle(&mut self, handle: Handle, fraction: f64) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.drag_handle(controller.transport(), handle, fraction)
    }

    pub fn nudge_handle(&mut self, handle: Handle, millis: i64) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.nudge_handle(controller.transport(), handle, millis)
    }

    pub fn set_time_field(
        &mut self,
        handle: Handle,
        part: TimePart,
        text: &str,
    ) -> Result<(), EditorError> {
        let (session, _) = self.session()?;
        session.set_time_field(handle, part, text)
    }

    pub fn commit_time_field(&mut self, handle: Handle) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.commit_time_field(controller.transport(), handle)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), EditorError> {
        let (session, _) = self.session()?;
        session.set_zoom(zoom);
        Ok(())
    }

    pub fn set_pan(&mut self, pan: f64) -> Result<(), EditorError> {
        let (session, _) = self.session()?;
        session.set_pan(pan);
        Ok(())
    }

    /// Auditions the selected region. Whatever is sounding, including a pad, stops first.
    pub fn preview_play(&mut self) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.preview_play(controller.transport_mut())
    }

    /// Stops the preview. Harmless when nothing is previewing or no editor is open.
    pub fn preview_stop(&mut self) -> bool {
        match self.session() {
            Ok((session, controller)) => session.preview_stop(controller.transport_mut()),
            Err(_) => false,
        }
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) -> Result<(), EditorError> {
        let (session, controller) = self.session()?;
        session.set_loop_enabled(controller.transport(), enabled);
        Ok(())
    }

    /// The preview playhead as a fraction of the buffer, while a preview is sounding.
    pub fn playhead(&mut self) -> Option<f64> {
        let (session, controller) = self.session().ok()?;
        session.playhead(controller.transport())
    }

    /// Chooses the pad that `save_to_pad(None)` saves to.
    pub fn select_pad(&mut self, pad: u8) -> Result<(), EditorError> {
        let pad = PadId::new(pad)?;
        let (session, _) = self.session()?;
        session.select_pad(pad);
        Ok(())
    }

    /// Extracts the selected region and assigns it to the given pad, or to the selected pad.
    /// The pad loops if the editor's loop toggle is on, and keeps its speed.
    pub fn save_to_pad(&mut self, pad: Option<u8>) -> Result<PadId, EditorError> {
        let pad = pad.map(PadId::new).transpose()?;
        let (session, controller) = self.session()?;
        let pad = pad.unwrap_or_else(|| session.selected_pad());

        let clip = session.extract(controller.transport_mut())?;
        let frames = clip.frames();
        let uri = controller.clips_mut().register(clip);
        controller.assign_source(
            pad,
            uri,
            session.loop_enabled(),
            session.file_name().map(str::to_string),
        );
        info!(pad = %pad, frames, "Saved region to pad");
        Ok(pad)
    }

    /// Presses a pad. See [`TriggerController::trigger`].
    pub fn trigger_pad(&mut self, pad: u8) -> Result<TriggerOutcome, PadError> {
        let pad = PadId::new(pad)?;
        self.pump();
        self.controller.trigger(pad)
    }

    /// Sets a pad's speed and returns the stored, clamped rate.
    pub fn set_pad_speed(&mut self, pad: u8, rate: f64) -> Result<f64, PadError> {
        let pad = PadId::new(pad)?;
        self.pump();
        Ok(self.controller.set_speed(pad, rate))
    }

    /// The pad currently sounding, if any.
    pub fn active_pad(&mut self) -> Option<PadId> {
        self.pump();
        self.controller.active_pad()
    }

    pub fn pads(&self) -> &PadBank {
        self.controller.bank()
    }

    pub fn controller(&self) -> &TriggerController {
        &self.controller
    }

    /// Silences everything.
    pub fn stop_all(&mut self) {
        self.controller.stop_all();
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;
    use crate::audio::{mock, mock::DeviceEvent, DecodeError, PlaybackError};
    use crate::editor::{Cell, ExtractError};
    use crate::pads::PadSource;
    use crate::testutil::{ramp, sine, wav_bytes, write_wav};

    fn engine_with(yaml: &str) -> (Arc<mock::Device>, Engine) {
        let device = Arc::new(mock::Device::get("mock-engine"));
        let config = config::Engine::from_yaml(yaml).expect("config");
        let engine = Engine::new(&config, device.clone());
        (device, engine)
    }

    /// Ten seconds of mono audio at 44.1kHz.
    fn ten_seconds() -> Vec<u8> {
        wav_bytes(&[sine(440.0, 0.5, 44100, 441_000)], 44100, 32)
    }

    fn pad(id: u8) -> PadId {
        PadId::new(id).expect("pad")
    }

    #[test]
    fn test_save_typed_region_and_play_once() -> Result<(), Box<dyn Error>> {
        let (device, mut engine) = engine_with("{}");
        engine.open_editor();
        engine.upload_file("hook.wav", &ten_seconds())?;

        engine.set_time_field(Handle::Start, TimePart::Seconds, "2")?;
        engine.commit_time_field(Handle::Start)?;
        engine.set_time_field(Handle::End, TimePart::Seconds, "4")?;
        engine.commit_time_field(Handle::End)?;
        engine.set_loop_enabled(false)?;

        assert_eq!(pad(2), engine.save_to_pad(Some(2))?);
        let slot = engine.pads().get(pad(2));
        assert!(!slot.is_looping());
        assert_eq!("hook.wav", slot.label());
        let uri = slot.source_uri().expect("clip").clone();
        let clip = engine.controller().clips().get(&uri).expect("registered");
        assert_eq!(88200, clip.frames());
        assert_eq!(44 + 88200 * 2, clip.bytes().len());

        assert_eq!(TriggerOutcome::Started, engine.trigger_pad(2)?);
        assert_eq!(Some(pad(2)), engine.active_pad());
        device.advance(44100);
        assert_eq!(Some(pad(2)), engine.active_pad());
        device.advance(44100);
        assert_eq!(None, engine.active_pad());
        assert_eq!(vec![EngineEvent::PadEnded(pad(2))], engine.poll_events());
        Ok(())
    }

    #[test]
    fn test_preview_and_pads_are_exclusive() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        write_wav(dir.path().join("beat1.wav"), vec![vec![8000_i16; 4410]], 44100)?;
        let (device, mut engine) =
            engine_with(&format!("pads:\n  beats_dir: {}\n", dir.path().display()));

        engine.open_editor();
        engine.upload_file("ramp.wav", &wav_bytes(&[ramp(44100)], 44100, 32))?;
        engine.preview_play()?;
        assert!(engine.playhead().is_some());

        engine.trigger_pad(1)?;
        assert_eq!(Some(pad(1)), engine.active_pad());
        assert_eq!(None, engine.playhead());

        let events = device.events();
        assert_eq!(3, events.len());
        assert!(matches!(&events[0], DeviceEvent::Play { label, .. } if label == "preview"));
        assert!(matches!(events[1], DeviceEvent::Stop { .. }));
        assert!(matches!(&events[2], DeviceEvent::Play { label, .. } if label == "Beat 1"));

        // Previewing again silences the pad.
        engine.preview_play()?;
        assert_eq!(None, engine.active_pad());
        device.advance(1);
        assert_eq!(1, device.active_voices());
        Ok(())
    }

    #[test]
    fn test_single_pass_preview_ends() -> Result<(), Box<dyn Error>> {
        let (device, mut engine) = engine_with("editor:\n  loop_enabled: false\n");
        engine.open_editor();
        engine.upload_file("ramp.wav", &wav_bytes(&[ramp(1000)], 44100, 32))?;
        engine.drag_handle(Handle::End, 0.5)?;
        engine.preview_play()?;

        device.advance(500);
        assert_eq!(vec![EngineEvent::PreviewEnded], engine.poll_events());
        assert_eq!(None, engine.playhead());
        assert!(!engine.preview_stop());
        Ok(())
    }

    #[test]
    fn test_failed_output_clears_active_pad() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        write_wav(dir.path().join("beat4.wav"), vec![vec![8000_i16; 4410]], 44100)?;
        let (device, mut engine) =
            engine_with(&format!("pads:\n  beats_dir: {}\n", dir.path().display()));

        engine.trigger_pad(4)?;
        assert_eq!(Some(pad(4)), engine.active_pad());
        device.fail();
        assert_eq!(None, engine.active_pad());
        assert_eq!(vec![EngineEvent::PadEnded(pad(4))], engine.poll_events());
        Ok(())
    }

    #[test]
    fn test_closed_session_operations() {
        let (_device, mut engine) = engine_with("{}");
        assert!(matches!(
            engine.upload_file("x.wav", &[]),
            Err(EditorError::SessionClosed)
        ));
        assert!(matches!(engine.set_zoom(2.0), Err(EditorError::SessionClosed)));
        assert!(!engine.preview_stop());
        assert!(!engine.preview_stop());
        assert_eq!(None, engine.playhead());

        let handle = engine.open_editor();
        let newer = engine.open_editor();
        assert!(!engine.close_editor(handle));
        assert!(engine.close_editor(newer));
        assert!(engine.editor().is_none());
    }

    #[test]
    fn test_close_editor_stops_preview() -> Result<(), Box<dyn Error>> {
        let (device, mut engine) = engine_with("{}");
        let handle = engine.open_editor();
        engine.upload_file("ramp.wav", &wav_bytes(&[ramp(44100)], 44100, 32))?;
        engine.preview_play()?;
        assert!(engine.close_editor(handle));
        assert_eq!(0, device.active_voices());
        Ok(())
    }

    #[test]
    fn test_failed_upload_resets_editor() -> Result<(), Box<dyn Error>> {
        let (_device, mut engine) = engine_with("{}");
        engine.open_editor();
        engine.upload_file("hook.wav", &ten_seconds())?;
        engine.set_zoom(4.0)?;

        let result = engine.upload_file("notes.txt", b"not audio at all");
        assert!(matches!(
            result,
            Err(EditorError::Decode(DecodeError::UnsupportedFormat(_)))
        ));
        let editor = engine.editor().expect("open");
        assert!(editor.buffer().is_none());
        assert!(editor.last_error().is_some());
        assert_eq!(1.0, editor.view().zoom());
        assert!(matches!(engine.render_frame(), Err(EditorError::NoAudio)));
        Ok(())
    }

    #[test]
    fn test_render_frame_uses_config_and_playhead() -> Result<(), Box<dyn Error>> {
        let (device, mut engine) =
            engine_with("editor:\n  raster_width: 100\n  raster_height: 20\n");
        engine.open_editor();
        engine.upload_file("ramp.wav", &wav_bytes(&[ramp(10_000)], 44100, 32))?;
        engine.drag_handle(Handle::Start, 0.5)?;

        let raster = engine.render_frame()?;
        assert_eq!(100, raster.width());
        assert_eq!(20, raster.height());
        assert_eq!(50, raster.columns_with(Cell::REGION).len());
        assert!(raster.columns_with(Cell::PLAYHEAD).is_empty());

        engine.preview_play()?;
        device.advance(1000);
        let raster = engine.render_frame()?;
        assert_eq!(vec![60], raster.columns_with(Cell::PLAYHEAD));
        Ok(())
    }

    #[test]
    fn test_save_errors() -> Result<(), Box<dyn Error>> {
        let (_device, mut engine) = engine_with("{}");
        engine.open_editor();
        assert!(matches!(engine.save_to_pad(None), Err(EditorError::NoAudio)));

        engine.upload_file("hook.wav", &ten_seconds())?;
        assert!(matches!(
            engine.save_to_pad(Some(9)),
            Err(EditorError::Pad(PadError::InvalidPad(9)))
        ));

        engine.drag_handle(Handle::Start, 0.5)?;
        engine.drag_handle(Handle::End, 0.2)?;
        assert!(matches!(
            engine.save_to_pad(None),
            Err(EditorError::Extract(ExtractError::EmptySelection))
        ));
        assert_eq!(&PadSource::BuiltIn(1), engine.pads().get(pad(1)).source());

        assert!(matches!(
            engine.preview_play(),
            Err(EditorError::Playback(PlaybackError::InvalidRegion { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_save_to_selected_pad_keeps_speed() -> Result<(), Box<dyn Error>> {
        let (_device, mut engine) = engine_with("{}");
        assert_eq!(0.5, engine.set_pad_speed(6, 0.1)?);

        engine.open_editor();
        engine.upload_file("hook.wav", &ten_seconds())?;
        engine.select_pad(6)?;
        assert_eq!(pad(6), engine.save_to_pad(None)?);

        let slot = engine.pads().get(pad(6));
        assert_eq!(0.5, slot.rate());
        assert!(slot.is_looping());
        assert!(slot.source_uri().is_some());
        Ok(())
    }

    #[test]
    fn test_pad_speed_and_trigger_validation() {
        let (_device, mut engine) = engine_with("pads:\n  default_rate: 3.0\n");
        assert_eq!(1.5, engine.pads().get(pad(1)).rate());
        assert!(matches!(
            engine.trigger_pad(0),
            Err(PadError::InvalidPad(0))
        ));
        assert_eq!(1.5, engine.set_pad_speed(3, 5.0).expect("speed"));
        assert_eq!(0.5, engine.set_pad_speed(3, -1.0).expect("speed"));

        // No beats were configured, so the default pads have nothing to play.
        assert!(matches!(
            engine.trigger_pad(3),
            Err(PadError::Playback(PlaybackError::NoSource(_)))
        ));
        assert_eq!(None, engine.active_pad());
    }
}
