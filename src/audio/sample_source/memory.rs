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
use std::time::Duration;

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A sample source that produces planar samples straight from memory.
pub struct MemorySampleSource {
    /// One Vec per channel
    planar_samples: Vec<Vec<f32>>,
    /// Current position in frames
    current_frame: usize,
    sample_rate: u32,
}

impl MemorySampleSource {
    /// Creates a source from planar samples. Every channel must hold the same number of frames.
    pub fn from_planar(planar_samples: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            planar_samples,
            current_frame: 0,
            sample_rate,
        }
    }

    fn total_frames(&self) -> usize {
        self.planar_samples.first().map(|c| c.len()).unwrap_or(0)
    }
}

impl SampleSource for MemorySampleSource {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        if output.len() != self.planar_samples.len() {
            return Err(SampleSourceError::ChannelMismatch {
                expected: self.planar_samples.len(),
                actual: output.len(),
            });
        }

        let frames = self
            .total_frames()
            .saturating_sub(self.current_frame)
            .min(max_frames);
        let range = self.current_frame..self.current_frame + frames;
        for (out, channel) in output.iter_mut().zip(self.planar_samples.iter()) {
            out.clear();
            out.extend_from_slice(&channel[range.clone()]);
        }
        self.current_frame += frames;

        Ok(frames)
    }

    fn channel_count(&self) -> u16 {
        self.planar_samples.len() as u16
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_frames() as f64 / self.sample_rate as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_until_exhausted() {
        let mut source =
            MemorySampleSource::from_planar(vec![vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]], 10);
        assert_eq!(source.channel_count(), 2);
        assert_eq!(source.duration(), Some(Duration::from_millis(300)));

        let mut output = vec![Vec::new(); 2];
        assert_eq!(source.next_chunk(&mut output, 2).unwrap(), 2);
        assert_eq!(output[0], vec![0.1, 0.2]);
        assert_eq!(output[1], vec![-0.1, -0.2]);
        assert_eq!(source.next_chunk(&mut output, 2).unwrap(), 1);
        assert_eq!(output[1], vec![-0.3]);
        assert_eq!(source.next_chunk(&mut output, 2).unwrap(), 0);
        assert!(output[0].is_empty());
    }
}
