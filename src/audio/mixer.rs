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
// Core mixing logic: clips are summed into a 32-bit accumulator and hard-clipped to 16 bits
// only when finished frames leave the mixer.
use std::collections::VecDeque;

use crate::audio::format::clamp_sample;
use crate::samples::Clip;

/// Accumulates overlapping clips. The buffer starts at `origin`, the first frame that has
/// not been emitted yet; everything before it is gone.
#[derive(Debug, Clone)]
pub struct Mixer {
    /// Number of interleaved output channels
    channels: usize,
    /// Absolute frame index of the front of the buffer
    origin: u64,
    /// Interleaved accumulated samples
    buffer: VecDeque<i32>,
}

impl Mixer {
    /// Creates a new mixer
    pub fn new(channels: u16) -> Self {
        Self {
            channels: channels.max(1) as usize,
            origin: 0,
            buffer: VecDeque::new(),
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    /// The first frame not yet emitted.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Frames currently held.
    pub fn buffered_frames(&self) -> usize {
        self.buffer.len() / self.channels
    }

    /// One past the last frame any overlay has reached.
    pub fn buffered_end(&self) -> u64 {
        self.origin + self.buffered_frames() as u64
    }

    /// Adds a clip sample by sample starting at the given absolute frame. The buffer grows to
    /// hold the whole clip. A clip with fewer channels than the output repeats its last
    /// channel. A multichannel clip mixed into mono output is averaged down to one channel.
    /// Frames that were already emitted are skipped.
    pub fn overlay(&mut self, at_frame: u64, clip: &Clip) {
        let clip_channels = clip.channel_count().max(1) as usize;
        let clip_frames = clip.frames() as u64;
        let end = at_frame.saturating_add(clip_frames);
        if end <= self.origin {
            return;
        }
        self.ensure_frames(end);

        let samples = clip.samples();
        let first = self.origin.saturating_sub(at_frame);
        for frame in first..clip_frames {
            let src = frame as usize * clip_channels;
            let dst = (at_frame + frame - self.origin) as usize * self.channels;
            if self.channels == 1 && clip_channels > 1 {
                let sum: i32 = samples[src..src + clip_channels]
                    .iter()
                    .map(|sample| *sample as i32)
                    .sum();
                let slot = &mut self.buffer[dst];
                *slot = slot.saturating_add(sum / clip_channels as i32);
                continue;
            }
            for channel in 0..self.channels {
                let sample = samples[src + channel.min(clip_channels - 1)] as i32;
                let slot = &mut self.buffer[dst + channel];
                *slot = slot.saturating_add(sample);
            }
        }
    }

    /// Pads the buffer with silence so that it reaches the given absolute frame.
    pub fn ensure_frames(&mut self, until_frame: u64) {
        let needed = until_frame.saturating_sub(self.origin) as usize * self.channels;
        if self.buffer.len() < needed {
            self.buffer.resize(needed, 0);
        }
    }

    /// Removes up to `max_frames` frames from the front, clamped to 16 bits and appended to
    /// `output`. Returns the frames emitted.
    pub fn emit(&mut self, max_frames: usize, output: &mut Vec<i16>) -> usize {
        let frames = max_frames.min(self.buffered_frames());
        output.extend(
            self.buffer
                .drain(..frames * self.channels)
                .map(clamp_sample),
        );
        self.origin += frames as u64;
        frames
    }

    /// Drops everything and starts again at frame zero.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.origin = 0;
    }
}
