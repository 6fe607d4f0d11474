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
use std::path::Path;

use ::config::{Config, File, FileFormat};
use serde::Deserialize;

mod audio;
mod editor;
mod error;
mod pads;

pub use self::audio::{Audio, DEFAULT_DEVICE};
pub use self::editor::Editor;
pub use self::error::ConfigError;
pub use self::pads::Pads;

/// The engine configuration. Every section is optional.
#[derive(Deserialize, Clone, Default)]
pub struct Engine {
    /// The output device.
    audio: Option<Audio>,

    /// Editor defaults.
    editor: Option<Editor>,

    /// Pad bank defaults.
    pads: Option<Pads>,
}

impl Engine {
    /// Parses an engine configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Engine, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Engine>()?)
    }

    /// Parses an engine configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Engine, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Engine>()?)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Returns the editor configuration.
    pub fn editor(&self) -> Editor {
        self.editor.clone().unwrap_or_default()
    }

    /// Returns the pads configuration.
    pub fn pads(&self) -> Pads {
        self.pads.clone().unwrap_or_default()
    }
}
