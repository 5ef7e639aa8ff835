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
use super::{AudioSink, SinkError};
use crate::audio::format::OutputFormat;

/// Collects everything submitted.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    format: OutputFormat,
    samples: Vec<i16>,
    chunks: usize,
    finished: bool,
}

impl MemorySink {
    pub fn new(format: OutputFormat) -> MemorySink {
        MemorySink {
            format,
            ..Default::default()
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels() as usize
    }

    /// Number of submit calls that carried audio.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl AudioSink for MemorySink {
    fn submit(&mut self, chunk: &[i16]) -> Result<usize, SinkError> {
        if self.finished {
            return Err(SinkError::Closed);
        }
        if !chunk.is_empty() {
            self.chunks += 1;
        }
        self.samples.extend_from_slice(chunk);
        Ok(chunk.len() / self.format.channels() as usize)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }

    fn channel_count(&self) -> u16 {
        self.format.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }
}
