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

use std::fmt;

use crate::config::ConfigError;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of output channels.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Bits per output sample. All mixing output is signed 16-bit PCM.
pub const BITS_PER_SAMPLE: u16 = 16;

/// The format every loaded clip is normalized to and every mixed frame is emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Sample rate in Hz
    sample_rate: u32,
    /// Interleaved channels per frame (mono or stereo)
    channels: u16,
}

impl OutputFormat {
    /// Creates a new OutputFormat
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidOutputFormat(
                "sample rate must be greater than 0".to_string(),
            ));
        }
        if !(1..=2).contains(&channels) {
            return Err(ConfigError::InvalidOutputFormat(format!(
                "only mono or stereo output is supported, got {} channels",
                channels
            )));
        }

        Ok(OutputFormat {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Converts a length in seconds to a whole number of frames, rounding to the nearest frame.
    pub fn frames_for_seconds(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64).round().max(0.0) as u64
    }

    /// Converts a frame count back to seconds.
    pub fn seconds_for_frames(&self, frames: u64) -> f64 {
        frames as f64 / self.sample_rate as f64
    }
}

impl Default for OutputFormat {
    /// 44.1kHz stereo, the format the rhythm box has always mixed in.
    fn default() -> Self {
        OutputFormat {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}bit",
            self.sample_rate, self.channels, BITS_PER_SAMPLE
        )
    }
}

/// Hard-clips an accumulated sample into the signed 16-bit range.
#[inline]
pub fn clamp_sample(sample: i32) -> i16 {
    sample.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Quantizes a float sample in [-1.0, 1.0] to signed 16-bit, clipping anything outside.
/// Scales by 32768 so 16-bit sources decoded to float come back unchanged.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    (sample * 32768.0)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
