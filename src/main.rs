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
mod shell;

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use bars_sampler::audio::{self, decode, AudioBuffer};
use bars_sampler::config;
use bars_sampler::editor::{
    extract, render, Handle, LoopRegion, RasterSize, TimeParts, ViewWindow, DEFAULT_MAX_ZOOM,
};
use bars_sampler::util::{duration_display, filename_display};
use bars_sampler::{Engine, EngineEvent};
use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A waveform loop editor and eight-pad sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the format and length of a WAV file.
    Inspect {
        /// The WAV file.
        path: PathBuf,
    },
    /// Prints the waveform of a WAV file as text.
    Waveform {
        /// The WAV file.
        path: PathBuf,
        /// The zoom factor.
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        /// The pan position, from 0 to 1.
        #[arg(long, default_value_t = 0.0)]
        pan: f64,
        /// Loop start as m:ss.mmm.
        #[arg(long)]
        start: Option<String>,
        /// Loop end as m:ss.mmm.
        #[arg(long)]
        end: Option<String>,
        /// Columns to draw.
        #[arg(long, default_value_t = 80)]
        width: usize,
        /// Rows to draw.
        #[arg(long, default_value_t = 16)]
        height: usize,
    },
    /// Writes a region of a WAV file to a new 16-bit WAV file.
    Trim {
        /// The WAV file.
        path: PathBuf,
        /// Region start as m:ss.mmm.
        start: String,
        /// Region end as m:ss.mmm.
        end: String,
        /// Where to write the trimmed file.
        out: PathBuf,
    },
    /// Plays a region of a WAV file through the audio device.
    Preview {
        /// The WAV file.
        path: PathBuf,
        /// Region start as m:ss.mmm.
        #[arg(long)]
        start: Option<String>,
        /// Region end as m:ss.mmm.
        #[arg(long)]
        end: Option<String>,
        /// Loop the region until interrupted.
        #[arg(long = "loop")]
        looping: bool,
        /// The engine configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Runs an interactive editor and pad session on stdin.
    Pads {
        /// The engine configuration file.
        config: PathBuf,
    },
}

fn load(path: &Path) -> Result<AudioBuffer, Box<dyn Error>> {
    Ok(decode(&fs::read(path)?)?)
}

/// Converts optional m:ss.mmm times into a loop region over the buffer.
fn region_of(buffer: &AudioBuffer, start: Option<&str>, end: Option<&str>) -> LoopRegion {
    let duration = buffer.duration_secs();
    let fraction = |time: &str| TimeParts::parse(time).to_seconds() / duration;
    let mut region = LoopRegion::default();
    if let Some(start) = start {
        region.set(Handle::Start, fraction(start));
    }
    if let Some(end) = end {
        region.set(Handle::End, fraction(end));
    }
    region
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Inspect { path } => {
            let buffer = load(&path)?;
            println!("{}:", filename_display(&path));
            println!("  channels: {}", buffer.channel_count());
            println!("  sample rate: {}", buffer.sample_rate());
            println!("  frames: {}", buffer.len());
            println!("  duration: {}", duration_display(buffer.duration()));
        }
        Commands::Waveform {
            path,
            zoom,
            pan,
            start,
            end,
            width,
            height,
        } => {
            let buffer = load(&path)?;
            let region = region_of(&buffer, start.as_deref(), end.as_deref());
            let mut view = ViewWindow::new(DEFAULT_MAX_ZOOM);
            view.set_zoom(zoom);
            view.set_pan(pan);

            let raster = render(&buffer, &view, &region, None, RasterSize { width, height });
            print!("{}", raster.to_text());
            println!(
                "zoom {} pan {}% region {:.3}..{:.3}",
                view.zoom_label(),
                view.pan_percent(),
                region.start(),
                region.end()
            );
        }
        Commands::Trim {
            path,
            start,
            end,
            out,
        } => {
            let buffer = load(&path)?;
            let region = region_of(&buffer, Some(&start), Some(&end));
            let clip = extract(&buffer, &region)?;
            fs::write(&out, clip.bytes())?;
            println!(
                "Wrote {} frames ({}) to {}",
                clip.frames(),
                duration_display(clip.duration()),
                out.display()
            );
        }
        Commands::Preview {
            path,
            start,
            end,
            looping,
            config: config_path,
        } => {
            let config = match config_path {
                Some(config_path) => config::Engine::deserialize(&config_path)?,
                None => config::Engine::default(),
            };

            let mut engine = Engine::from_config(&config)?;
            engine.open_editor();
            engine.upload_file(filename_display(&path), &fs::read(&path)?)?;
            let buffer = engine
                .editor()
                .and_then(|editor| editor.buffer())
                .ok_or("no audio loaded")?;
            let region = region_of(buffer, start.as_deref(), end.as_deref());
            engine.drag_handle(Handle::Start, region.start())?;
            engine.drag_handle(Handle::End, region.end())?;
            engine.set_loop_enabled(looping)?;
            engine.preview_play()?;
            info!(file = filename_display(&path), looping, "Previewing");

            loop {
                if engine.poll_events().contains(&EngineEvent::PreviewEnded) {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
        Commands::Pads {
            config: config_path,
        } => {
            let config = config::Engine::deserialize(&config_path)?;
            let engine = Engine::from_config(&config)?;
            let stdin = io::stdin();
            shell::Shell::new(engine, io::stdout()).run(stdin.lock())?;
        }
    };

    Ok(())
}
