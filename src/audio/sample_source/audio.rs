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
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::SampleSourceError;
use super::traits::SampleSource;

/// A sample source that decodes audio files (WAV, FLAC, OGG, MP3, etc.) with symphonia
/// and hands out planar f32 samples in [-1.0, 1.0].
pub struct AudioSampleSource {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    is_finished: bool,
    // The most recently decoded packet, planar, and how far into it we've read.
    pending: Vec<Vec<f32>>,
    pending_position: usize,
    channels: u16,
    sample_rate: u32,
    duration: Option<Duration>,
}

impl AudioSampleSource {
    /// Opens and probes the given file. `buffer_size` is the expected chunk size in frames
    /// and is only used to size the internal buffers.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> Result<Self, SampleSourceError> {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            SampleSourceError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", file_path, e),
            ))
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SampleSourceError::NoAudioTrack(file_path.clone()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| SampleSourceError::MissingSampleRate(file_path.clone()))?;
        let duration = params
            .n_frames
            .map(|n_frames| Duration::from_secs_f64(n_frames as f64 / sample_rate as f64));

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs().make(&params, &decoder_opts)?;

        // Some containers don't carry a channel layout. In that case the first decoded
        // packet tells us, and its samples become the first pending chunk.
        let (channels, pending) = match params.channels {
            Some(channels) if channels.count() > 0 => (channels.count() as u16, Vec::new()),
            _ => match Self::decode_next_packet(format_reader.as_mut(), decoder.as_mut(), track_id)?
            {
                Some(planes) => (planes.len() as u16, planes),
                None => return Err(SampleSourceError::MissingChannels(file_path)),
            },
        };

        let mut source = Self {
            format_reader,
            decoder,
            track_id,
            is_finished: false,
            pending,
            pending_position: 0,
            channels,
            sample_rate,
            duration,
        };
        for plane in source.pending.iter_mut() {
            plane.reserve(buffer_size.saturating_sub(plane.len()));
        }

        Ok(source)
    }

    /// Reads the next packet, mapping the end-of-stream conditions symphonia reports to None.
    fn read_next_packet(
        format_reader: &mut dyn FormatReader,
    ) -> Result<Option<Packet>, SampleSourceError> {
        match format_reader.next_packet() {
            Ok(packet) => Ok(Some(packet)),
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(None)
            }
            // Some decoders return DecodeError at EOF instead of IoError
            Err(SymphoniaError::DecodeError(_)) => Ok(None),
            Err(e) => Err(SampleSourceError::AudioError(e)),
        }
    }

    /// Decodes packets for our track until one yields audio. Returns the packet's samples
    /// as planar f32, or None at the end of the stream.
    fn decode_next_packet(
        format_reader: &mut dyn FormatReader,
        decoder: &mut dyn Decoder,
        track_id: u32,
    ) -> Result<Option<Vec<Vec<f32>>>, SampleSourceError> {
        loop {
            let packet = match Self::read_next_packet(format_reader) {
                Ok(Some(packet)) => packet,
                Ok(None) => return Ok(None),
                Err(SampleSourceError::AudioError(SymphoniaError::ResetRequired)) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(e),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    decoder.decode(&packet)?
                }
                Err(e) => return Err(SampleSourceError::AudioError(e)),
            };

            // Header packets (e.g. Vorbis) decode to zero frames; keep reading.
            if decoded.frames() == 0 {
                continue;
            }

            let mut buffer: AudioBuffer<f32> = decoded.make_equivalent();
            decoded.convert(&mut buffer);
            let planes = (0..buffer.spec().channels.count())
                .map(|ch| buffer.chan(ch).to_vec())
                .collect();
            return Ok(Some(planes));
        }
    }

    fn pending_frames(&self) -> usize {
        self.pending
            .first()
            .map(|plane| plane.len().saturating_sub(self.pending_position))
            .unwrap_or(0)
    }
}

impl SampleSource for AudioSampleSource {
    fn next_chunk(
        &mut self,
        output: &mut [Vec<f32>],
        max_frames: usize,
    ) -> Result<usize, SampleSourceError> {
        let channels = self.channels as usize;
        if output.len() != channels {
            return Err(SampleSourceError::ChannelMismatch {
                expected: channels,
                actual: output.len(),
            });
        }
        for channel in output.iter_mut() {
            channel.clear();
        }

        let mut written = 0;
        while written < max_frames {
            if self.pending_frames() == 0 {
                if self.is_finished {
                    break;
                }
                match Self::decode_next_packet(
                    self.format_reader.as_mut(),
                    self.decoder.as_mut(),
                    self.track_id,
                )? {
                    Some(planes) => {
                        if planes.len() != channels {
                            return Err(SampleSourceError::ChannelMismatch {
                                expected: channels,
                                actual: planes.len(),
                            });
                        }
                        self.pending = planes;
                        self.pending_position = 0;
                    }
                    None => {
                        self.is_finished = true;
                        break;
                    }
                }
            }

            let to_take = self.pending_frames().min(max_frames - written);
            let range = self.pending_position..self.pending_position + to_take;
            for (out, plane) in output.iter_mut().zip(self.pending.iter()) {
                out.extend_from_slice(&plane[range.clone()]);
            }
            self.pending_position += to_take;
            written += to_take;
        }

        Ok(written)
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }
}
