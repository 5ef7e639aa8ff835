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

//! Track definition files.
//!
//! A track file names the instrument samples, the patterns and the song that sequences them.
//! Files are read with the `config` crate, so the format follows the extension: the classic
//! INI layout, or YAML.
//!
//! ```ini
//! [paths]
//! samples = samples
//!
//! [samples]
//! kick = kick.wav
//! snare = snare.wav
//!
//! [song]
//! bpm = 128
//! ticks = 4
//! patterns = beat beat
//!
//! [pattern.beat]
//! kick  = x... x... x... x...
//! snare = .... x... .... x...
//! ```

mod error;
mod track;

pub use error::ConfigError;
pub use track::{Paths, SongSection, TrackFile, DEFAULT_BPM, DEFAULT_TICKS};
