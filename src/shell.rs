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
use std::error::Error;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use bars_sampler::editor::{Handle, TimePart};
use bars_sampler::pads::TriggerOutcome;
use bars_sampler::util::filename_display;
use bars_sampler::{Engine, EngineEvent};
use tracing::warn;

const HELP: &str = "\
commands:
  load <file>                      load a WAV file into the editor
  drag <start|end> <fraction>      move a loop handle
  nudge <start|end> <millis>       move a loop handle by milliseconds
  field <start|end> <min|sec|ms> <text>
  commit <start|end>               apply typed time fields
  zoom <factor> | pan <fraction>
  play | stop | loop <on|off>      preview the loop region
  select <pad> | save [pad]        save the loop region to a pad
  trigger <pad> | speed <pad> <rate>
  frame                            print the waveform
  status | help | quit";

fn parse_handle(text: Option<&str>) -> Result<Handle, Box<dyn Error>> {
    match text {
        Some("start") => Ok(Handle::Start),
        Some("end") => Ok(Handle::End),
        _ => Err("expected start or end".into()),
    }
}

fn parse_part(text: Option<&str>) -> Result<TimePart, Box<dyn Error>> {
    match text {
        Some("min") => Ok(TimePart::Minutes),
        Some("sec") => Ok(TimePart::Seconds),
        Some("ms") => Ok(TimePart::Millis),
        _ => Err("expected min, sec or ms".into()),
    }
}

fn parse_arg<T>(text: Option<&str>, what: &str) -> Result<T, Box<dyn Error>>
where
    T: std::str::FromStr,
    T::Err: Error + 'static,
{
    Ok(text.ok_or_else(|| format!("missing {}", what))?.parse::<T>()?)
}

/// A line-oriented session over an engine. Each line is one command.
pub struct Shell<W: Write> {
    engine: Engine,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(mut engine: Engine, out: W) -> Shell<W> {
        engine.open_editor();
        Shell { engine, out }
    }

    /// Reads commands until `quit` or the end of input. Failed commands are reported and
    /// the session continues.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<(), Box<dyn Error>> {
        for line in input.lines() {
            let line = line?;
            match self.execute(&line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(command = line.trim(), err = %e, "Command failed");
                    writeln!(self.out, "error: {}", e)?;
                }
            }
            self.report_events()?;
        }
        self.engine.stop_all();
        Ok(())
    }

    fn report_events(&mut self) -> Result<(), Box<dyn Error>> {
        for event in self.engine.poll_events() {
            match event {
                EngineEvent::PadEnded(pad) => writeln!(self.out, "pad {} ended", pad)?,
                EngineEvent::PreviewEnded => writeln!(self.out, "preview ended")?,
            }
        }
        Ok(())
    }

    /// Runs one command. Returns false when the session should end.
    pub fn execute(&mut self, line: &str) -> Result<bool, Box<dyn Error>> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(true);
        };

        match command {
            "load" => {
                let path = words.next().ok_or("missing file")?;
                let path = Path::new(path);
                let bytes = fs::read(path)?;
                self.engine.upload_file(filename_display(path), &bytes)?;
                self.status()?;
            }
            "drag" => {
                let handle = parse_handle(words.next())?;
                self.engine
                    .drag_handle(handle, parse_arg(words.next(), "fraction")?)?;
                self.status()?;
            }
            "nudge" => {
                let handle = parse_handle(words.next())?;
                self.engine
                    .nudge_handle(handle, parse_arg(words.next(), "millis")?)?;
                self.status()?;
            }
            "field" => {
                let handle = parse_handle(words.next())?;
                let part = parse_part(words.next())?;
                self.engine
                    .set_time_field(handle, part, words.next().unwrap_or(""))?;
            }
            "commit" => {
                self.engine.commit_time_field(parse_handle(words.next())?)?;
                self.status()?;
            }
            "zoom" => {
                self.engine.set_zoom(parse_arg(words.next(), "zoom")?)?;
                self.status()?;
            }
            "pan" => {
                self.engine.set_pan(parse_arg(words.next(), "pan")?)?;
                self.status()?;
            }
            "play" => self.engine.preview_play()?,
            "stop" => {
                if !self.engine.preview_stop() {
                    writeln!(self.out, "not previewing")?;
                }
            }
            "loop" => match words.next() {
                Some("on") => self.engine.set_loop_enabled(true)?,
                Some("off") => self.engine.set_loop_enabled(false)?,
                _ => return Err("expected on or off".into()),
            },
            "select" => self.engine.select_pad(parse_arg(words.next(), "pad")?)?,
            "save" => {
                let pad = words.next().map(str::parse::<u8>).transpose()?;
                let pad = self.engine.save_to_pad(pad)?;
                writeln!(self.out, "saved to pad {}", pad)?;
            }
            "trigger" => {
                let pad: u8 = parse_arg(words.next(), "pad")?;
                match self.engine.trigger_pad(pad)? {
                    TriggerOutcome::Started => writeln!(self.out, "pad {} playing", pad)?,
                    TriggerOutcome::Stopped => writeln!(self.out, "pad {} stopped", pad)?,
                }
            }
            "speed" => {
                let pad: u8 = parse_arg(words.next(), "pad")?;
                let rate = self
                    .engine
                    .set_pad_speed(pad, parse_arg(words.next(), "rate")?)?;
                writeln!(self.out, "pad {} speed {:.2}", pad, rate)?;
            }
            "frame" => {
                let raster = self.engine.render_frame()?;
                write!(self.out, "{}", raster.to_text())?;
            }
            "status" => self.status()?,
            "help" => writeln!(self.out, "{}", HELP)?,
            "quit" | "exit" => return Ok(false),
            other => return Err(format!("unknown command {}, try help", other).into()),
        }
        Ok(true)
    }

    fn status(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(editor) = self.engine.editor() else {
            return Ok(writeln!(self.out, "no editor")?);
        };
        let Some(selector) = editor.selector() else {
            return Ok(writeln!(self.out, "no file loaded")?);
        };

        let mut line = format!("{}:", editor.file_name().unwrap_or("?"));
        for handle in [Handle::Start, Handle::End] {
            line.push_str(&format!(" {} {}", handle, selector.time(handle)));
        }
        line.push_str(&format!(
            " zoom {} pan {}%",
            editor.view().zoom_label(),
            editor.view().pan_percent()
        ));
        Ok(writeln!(self.out, "{}", line)?)
    }
}
