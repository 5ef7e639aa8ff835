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
use std::sync::Arc;
use std::time::Duration;

use crate::audio::format::quantize;

/// A decoded sample, interleaved signed 16-bit. Clips are immutable once loaded and cheap to
/// clone.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    data: Arc<Vec<i16>>,
    channel_count: u16,
    sample_rate: u32,
}

impl Clip {
    /// Wraps interleaved samples. A trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<i16>, channel_count: u16, sample_rate: u32) -> Clip {
        let channels = channel_count.max(1) as usize;
        samples.truncate(samples.len() / channels * channels);
        Clip {
            data: Arc::new(samples),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    /// Quantizes planar float samples. Every channel must hold the same number of frames.
    pub fn from_planar(planar: &[Vec<f32>], sample_rate: u32) -> Clip {
        let channels = planar.len().max(1);
        let frames = planar.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for channel in planar {
                data.push(quantize(channel.get(frame).copied().unwrap_or(0.0)));
            }
        }
        Clip {
            data: Arc::new(data),
            channel_count: channels as u16,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.data
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<i16>()
    }
}
