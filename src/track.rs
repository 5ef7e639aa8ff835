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

//! A track ready to mix: the validated song, its loaded samples and the resolved timeline.

use std::path::Path;

use tracing::{info, span, Level};

use crate::audio::{OutputFormat, SongStream};
use crate::config::TrackFile;
use crate::error::Error;
use crate::samples::SampleStore;
use crate::sequencer::{Song, Timeline};

/// How a track file should be turned into a track.
#[derive(Debug, Clone)]
pub struct TrackOptions {
    /// Format samples are normalized to and audio is mixed in.
    pub format: OutputFormat,
    /// Skip loading samples no sequenced pattern uses.
    pub discard_unused: bool,
    /// Plays these patterns instead of the song's own sequence.
    pub pattern_sequence: Option<Vec<String>>,
}

impl Default for TrackOptions {
    fn default() -> Self {
        TrackOptions {
            format: OutputFormat::default(),
            discard_unused: true,
            pattern_sequence: None,
        }
    }
}

#[derive(Debug)]
pub struct Track {
    definition: TrackFile,
    song: Song,
    samples: SampleStore,
    timeline: Timeline,
}

impl Track {
    /// Reads, validates and loads everything a track needs. Any problem is reported here;
    /// once a track is loaded, mixing it cannot fail.
    pub fn load(path: &Path, options: &TrackOptions) -> Result<Track, Error> {
        let span = span!(Level::INFO, "load track", path = ?path);
        let _enter = span.enter();

        let mut definition = TrackFile::deserialize(path)?;
        if let Some(sequence) = &options.pattern_sequence {
            definition.set_pattern_sequence(sequence);
        }
        if options.discard_unused {
            definition.discard_unused_instruments();
        }

        let song = definition.to_song()?;
        let samples = SampleStore::load(&definition.sample_paths(), options.format)?;
        let timeline = Timeline::resolve(&song, &samples)?;

        info!(
            bpm = song.bpm(),
            ticks = song.ticks_per_bar(),
            patterns = song.sequence().len(),
            total_ticks = timeline.total_ticks(),
            instruments = samples.len(),
            "Track loaded"
        );
        Ok(Track {
            definition,
            song,
            samples,
            timeline,
        })
    }

    /// The track file as read, after any sequence override and instrument discarding.
    pub fn definition(&self) -> &TrackFile {
        &self.definition
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn samples(&self) -> &SampleStore {
        &self.samples
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// A fresh stream over the whole track.
    pub fn stream(&self) -> Result<SongStream, Error> {
        Ok(SongStream::new(&self.song, &self.timeline, &self.samples)?)
    }
}
