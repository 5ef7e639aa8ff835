// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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
use std::path::PathBuf;

use clap::{crate_version, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trackmix::audio::format::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use trackmix::audio::{list_devices, CpalSink, OutputFormat, WavSink};
use trackmix::config::TrackFile;
use trackmix::player::{Player, DEFAULT_CHUNK_FRAMES};
use trackmix::playsync::CancelHandle;
use trackmix::{Track, TrackOptions};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A pattern based drum sample sequencer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mixes a track into a 16-bit WAV file.
    Render {
        #[command(flatten)]
        mix: MixArgs,
        /// The WAV file to write.
        output_path: String,
    },
    /// Plays a track through an audio output device.
    Play {
        #[command(flatten)]
        mix: MixArgs,
        /// The device name to play through. Uses the default output device if not given.
        #[arg[short, long]]
        device_name: Option<String>,
    },
    /// Validates a track file and prints its song and patterns.
    Patterns {
        /// The path to the track file.
        track_path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Saves a track definition as YAML.
    Save {
        /// The path to the track file.
        track_path: String,
        /// The YAML file to write.
        output_path: String,
        /// Replaces the pattern sequence, e.g. "intro beat beat".
        #[arg[short, long]]
        patterns: Option<String>,
    },
}

#[derive(Args)]
struct MixArgs {
    /// The path to the track file (.ini or .yaml).
    track_path: String,
    /// The output sample rate.
    #[arg[long, default_value_t = DEFAULT_SAMPLE_RATE]]
    sample_rate: u32,
    /// The number of output channels (1 or 2).
    #[arg[long, default_value_t = DEFAULT_CHANNELS]]
    channels: u16,
    /// Frames mixed per chunk.
    #[arg[long, default_value_t = DEFAULT_CHUNK_FRAMES]]
    chunk_frames: usize,
    /// Loads every sample, even ones no sequenced pattern plays.
    #[arg[long]]
    keep_unused: bool,
    /// Plays these patterns instead of the song's sequence, e.g. "intro beat beat".
    #[arg[short, long]]
    patterns: Option<String>,
}

impl MixArgs {
    fn load(&self) -> Result<Track, Box<dyn Error>> {
        let options = TrackOptions {
            format: OutputFormat::new(self.sample_rate, self.channels)?,
            discard_unused: !self.keep_unused,
            pattern_sequence: self.patterns.as_deref().map(parse_sequence),
        };
        Ok(Track::load(&PathBuf::from(&self.track_path), &options)?)
    }
}

fn parse_sequence(patterns: &str) -> Vec<String> {
    patterns
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { mix, output_path } => {
            let track = mix.load()?;
            let mut stream = track.stream()?;
            let mut sink = WavSink::create(&PathBuf::from(&output_path), stream.format())?;

            let summary =
                Player::new(mix.chunk_frames).play(&mut stream, &mut sink, &CancelHandle::new())?;
            println!(
                "Wrote {} frames ({:.3}s) to {}.",
                summary.frames,
                stream.format().seconds_for_frames(summary.frames),
                output_path
            );
        }
        Commands::Play { mix, device_name } => {
            let track = mix.load()?;
            let mut stream = track.stream()?;
            let mut sink = CpalSink::open(device_name.as_deref(), stream.format())?;

            println!("Playing through {}.", sink.name());
            Player::new(mix.chunk_frames).play(&mut stream, &mut sink, &CancelHandle::new())?;
        }
        Commands::Patterns { track_path } => {
            let definition = TrackFile::deserialize(&PathBuf::from(&track_path))?;
            let song = definition.to_song()?;

            println!(
                "Song: {} bpm, {} ticks per bar, {:.3}s",
                song.bpm(),
                song.ticks_per_bar(),
                song.duration().as_secs_f64()
            );
            println!("Sequence: {}", song.sequence().join(" "));
            println!("Instruments: {}", definition.instruments().join(", "));
            println!();
            for pattern in definition.all_patterns()? {
                println!("{}", pattern);
            }
        }
        Commands::Devices {} => {
            let devices = list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Save {
            track_path,
            output_path,
            patterns,
        } => {
            let mut definition = TrackFile::deserialize(&PathBuf::from(&track_path))?;
            if let Some(patterns) = patterns {
                definition.set_pattern_sequence(&parse_sequence(&patterns));
            }
            // Refuse to save something that wouldn't load again.
            definition.to_song()?;
            definition.save(&PathBuf::from(&output_path))?;
            println!("Saved to {}.", output_path);
        }
    }

    Ok(())
}
