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

//! Sample loading and caching.
//!
//! Samples are decoded entirely into memory and normalized to the output format before any
//! mixing starts, so the mix loop never touches the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::clip::Clip;
use crate::audio::format::OutputFormat;
use crate::audio::sample_source::{create_sample_source_from_file, SampleSource, SampleSourceError};

/// Frames read from the decoder per chunk.
const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Manages loading and caching of sample data.
pub struct SampleLoader {
    /// Cache of loaded samples by file path.
    cache: HashMap<PathBuf, Arc<Clip>>,
    /// The format every clip is converted to.
    format: OutputFormat,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            cache: HashMap::new(),
            format,
        }
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Clip>, SampleSourceError> {
        if let Some(clip) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(clip.clone());
        }

        info!(path = ?path, "Loading sample into memory");
        let mut source = create_sample_source_from_file(path, DEFAULT_BUFFER_SIZE)?;
        let source_sample_rate = source.sample_rate();
        let source_channels = source.channel_count();
        let clip = Arc::new(self.decode(&mut source)?);

        info!(
            path = ?path,
            source_channels,
            source_sample_rate,
            channels = clip.channel_count(),
            sample_rate = clip.sample_rate(),
            duration_ms = clip.duration().as_millis(),
            memory_kb = clip.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), clip.clone());
        Ok(clip)
    }

    /// Reads a source to the end and converts it to the loader's output format.
    pub fn decode<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Clip, SampleSourceError> {
        let channel_count = source.channel_count() as usize;
        let mut planar: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
        let mut chunk: Vec<Vec<f32>> = vec![Vec::with_capacity(DEFAULT_BUFFER_SIZE); channel_count];
        loop {
            let frames = source.next_chunk(&mut chunk, DEFAULT_BUFFER_SIZE)?;
            if frames == 0 {
                break;
            }
            for (all, part) in planar.iter_mut().zip(chunk.iter()) {
                all.extend_from_slice(part);
            }
        }

        let source_rate = source.sample_rate();
        let target_rate = self.format.sample_rate();
        if source_rate != target_rate {
            debug!(source_rate, target_rate, "Transcoding sample");
            planar = transcode_samples(&planar, source_rate, target_rate);
        }
        let planar = remix_channels(planar, self.format.channels());

        Ok(Clip::from_planar(&planar, target_rate))
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|clip| clip.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("format", &self.format.to_string())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Transcodes planar samples from one sample rate to another using linear interpolation.
/// Linear interpolation is simple and sufficient for drum hits and one-shots.
fn transcode_samples(planar: &[Vec<f32>], source_rate: u32, target_rate: u32) -> Vec<Vec<f32>> {
    let ratio = target_rate as f64 / source_rate as f64;
    planar
        .iter()
        .map(|samples| {
            let target_frames = (samples.len() as f64 * ratio).ceil() as usize;
            (0..target_frames)
                .map(|target_frame| {
                    let source_pos = target_frame as f64 / ratio;
                    let source_frame = source_pos.floor() as usize;
                    let frac = source_pos.fract() as f32;

                    let s0 = samples.get(source_frame).copied().unwrap_or(0.0);
                    let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);
                    s0 + (s1 - s0) * frac
                })
                .collect()
        })
        .collect()
}

/// Converts between channel layouts. Mono is duplicated into every output channel, wider
/// sources are averaged down to mono or truncated to their first channels.
fn remix_channels(planar: Vec<Vec<f32>>, target_channels: u16) -> Vec<Vec<f32>> {
    let target = target_channels as usize;
    let source = planar.len();
    if source == target {
        return planar;
    }

    let frames = planar.first().map(Vec::len).unwrap_or(0);
    match (source, target) {
        (0, _) => vec![Vec::new(); target],
        (1, _) => vec![planar[0].clone(); target],
        (_, 1) => {
            let scale = 1.0 / source as f32;
            vec![(0..frames)
                .map(|frame| planar.iter().map(|channel| channel[frame]).sum::<f32>() * scale)
                .collect()]
        }
        _ => planar.into_iter().take(target).collect(),
    }
}
