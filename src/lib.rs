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

//! A pattern sequencer in the style of the classic drum machines. Instrument samples are
//! triggered from ASCII bar patterns, mixed additively and streamed chunk by chunk to a WAV
//! file, a live output device or memory.

pub mod audio;
pub mod config;
pub mod error;
pub mod player;
pub mod playsync;
pub mod samples;
pub mod sequencer;
pub mod track;
#[cfg(test)]
mod testutil;

pub use error::Error;
pub use track::{Track, TrackOptions};
