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
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use super::{AudioSink, SinkError};
use crate::audio::format::{OutputFormat, BITS_PER_SAMPLE};

/// Writes 16-bit PCM to a WAV file.
pub struct WavSink {
    path: PathBuf,
    format: OutputFormat,
    writer: Option<WavWriter<BufWriter<File>>>,
    frames_written: u64,
}

impl WavSink {
    /// Creates (or truncates) the file at the given path.
    pub fn create(path: &Path, format: OutputFormat) -> Result<WavSink, SinkError> {
        let writer = WavWriter::create(
            path,
            WavSpec {
                channels: format.channels(),
                sample_rate: format.sample_rate(),
                bits_per_sample: BITS_PER_SAMPLE,
                sample_format: SampleFormat::Int,
            },
        )?;
        Ok(WavSink {
            path: path.to_path_buf(),
            format,
            writer: Some(writer),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioSink for WavSink {
    fn submit(&mut self, chunk: &[i16]) -> Result<usize, SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Closed)?;
        let mut samples = writer.get_i16_writer(chunk.len() as u32);
        for sample in chunk {
            samples.write_sample(*sample);
        }
        samples.flush()?;

        let frames = chunk.len() / self.format.channels() as usize;
        self.frames_written += frames as u64;
        Ok(frames)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!(
                path = ?self.path,
                frames = self.frames_written,
                seconds = self.format.seconds_for_frames(self.frames_written),
                "WAV file written"
            );
        }
        Ok(())
    }

    fn channel_count(&self) -> u16 {
        self.format.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let format = OutputFormat::new(22050, 2).unwrap();

        let mut sink = WavSink::create(&path, format).unwrap();
        assert_eq!(sink.submit(&[1, -1, 2, -2]).unwrap(), 2);
        assert_eq!(sink.submit(&[i16::MAX, i16::MIN]).unwrap(), 1);
        sink.finish().unwrap();
        assert_eq!(sink.frames_written(), 3);
        assert!(matches!(sink.submit(&[0, 0]), Err(SinkError::Closed)));

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, -1, 2, -2, i16::MAX, i16::MIN]);
    }
}
