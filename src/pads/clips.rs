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
use std::{
    collections::HashMap,
    fmt, fs,
    path::Path,
    sync::Arc,
};

use tracing::{debug, info, warn};

use super::bank::PAD_COUNT;
use crate::audio::{decode, AudioBuffer, DecodeError};
use crate::editor::EncodedClip;

const URI_SCHEME: &str = "clip://";

#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("Unknown clip {0}")]
    UnknownUri(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Addresses an encoded clip held by a [`ClipStore`], written `clip://<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipUri(u64);

impl ClipUri {
    pub fn new(id: u64) -> ClipUri {
        ClipUri(id)
    }
}

impl fmt::Display for ClipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", URI_SCHEME, self.0)
    }
}

/// In-memory home of saved clips and the built-in beats. Clips live as long as the store.
#[derive(Default)]
pub struct ClipStore {
    next_id: u64,
    clips: HashMap<ClipUri, EncodedClip>,
    decoded: HashMap<ClipUri, Arc<AudioBuffer>>,
    beats: HashMap<u8, Arc<AudioBuffer>>,
}

impl ClipStore {
    pub fn new() -> ClipStore {
        ClipStore::default()
    }

    /// Keeps an encoded clip and returns its address.
    pub fn register(&mut self, clip: EncodedClip) -> ClipUri {
        self.next_id += 1;
        let uri = ClipUri(self.next_id);
        debug!(uri = %uri, bytes = clip.bytes().len(), "Clip registered");
        self.clips.insert(uri.clone(), clip);
        uri
    }

    pub fn get(&self, uri: &ClipUri) -> Option<&EncodedClip> {
        self.clips.get(uri)
    }

    /// Decodes a clip's WAV bytes for playback. Decoded clips are cached.
    pub fn open(&mut self, uri: &ClipUri) -> Result<Arc<AudioBuffer>, ClipError> {
        if let Some(buffer) = self.decoded.get(uri) {
            return Ok(buffer.clone());
        }
        let clip = self
            .clips
            .get(uri)
            .ok_or_else(|| ClipError::UnknownUri(uri.to_string()))?;
        let buffer = Arc::new(decode(clip.bytes())?);
        self.decoded.insert(uri.clone(), buffer.clone());
        Ok(buffer)
    }

    pub fn set_beat(&mut self, number: u8, buffer: AudioBuffer) {
        self.beats.insert(number, Arc::new(buffer));
    }

    /// The built-in beat with the given number, if one was loaded.
    pub fn beat(&self, number: u8) -> Option<Arc<AudioBuffer>> {
        self.beats.get(&number).cloned()
    }

    /// Loads `beat1.wav` through `beat8.wav` from a directory. Missing or unreadable files
    /// are skipped. Returns how many beats were loaded.
    pub fn load_beats(&mut self, dir: &Path) -> usize {
        let mut loaded = 0;
        for number in 1..=PAD_COUNT {
            let path = dir.join(format!("beat{}.wav", number));
            if !path.is_file() {
                debug!(path = %path.display(), "No built-in beat");
                continue;
            }

            let result = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| decode(&bytes).map_err(|e| e.to_string()));
            match result {
                Ok(buffer) => {
                    self.set_beat(number, buffer);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), err = e, "Could not load built-in beat"),
            }
        }
        info!(dir = %dir.display(), loaded, "Loaded built-in beats");
        loaded
    }
}
