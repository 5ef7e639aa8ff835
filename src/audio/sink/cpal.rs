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
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{error, info};

use super::{AudioSink, SinkError};
use crate::audio::format::OutputFormat;

/// Chunks that can be queued ahead of the device before submit blocks.
const QUEUED_CHUNKS: usize = 4;

/// Extra time given to the device to play out queued audio when finishing.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// An output device as reported by cpal.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub host: String,
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists output devices on every available host.
pub fn list_devices() -> Result<Vec<DeviceInfo>, SinkError> {
    Ok(output_devices()?
        .into_iter()
        .map(|(info, _)| info)
        .collect())
}

fn output_devices() -> Result<Vec<(DeviceInfo, cpal::Device)>, SinkError> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(output_configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = output_configs
                .map(|config| config.channels())
                .max()
                .unwrap_or(0);

            if max_channels > 0 {
                devices.push((
                    DeviceInfo {
                        name: device.name()?,
                        host: host_id.name().to_string(),
                        max_channels,
                    },
                    device,
                ));
            }
        }
    }

    devices.sort_by_key(|(info, _)| info.name.to_string());
    Ok(devices)
}

/// Plays submitted chunks on a live output device. Chunks are handed to the device callback
/// through a bounded channel, so submit blocks once the device is far enough ahead and the
/// caller ends up paced in real time.
pub struct CpalSink {
    name: String,
    format: OutputFormat,
    sender: Option<Sender<Vec<i16>>>,
    drained: Arc<AtomicBool>,
    queued_frames: u64,
    // Dropping the stream stops playback.
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Opens the named output device, or the default one.
    pub fn open(device_name: Option<&str>, format: OutputFormat) -> Result<CpalSink, SinkError> {
        let (name, device) = match device_name {
            Some(name) => output_devices()?
                .into_iter()
                .find(|(info, _)| info.name.trim() == name)
                .map(|(info, device)| (info.name, device))
                .ok_or_else(|| SinkError::DeviceNotFound(name.to_string()))?,
            None => {
                let device = cpal::default_host()
                    .default_output_device()
                    .ok_or(SinkError::NoDefaultDevice)?;
                (device.name()?, device)
            }
        };

        let config = cpal::StreamConfig {
            channels: format.channels(),
            sample_rate: format.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let (sender, receiver) = crossbeam_channel::bounded::<Vec<i16>>(QUEUED_CHUNKS);
        let drained = Arc::new(AtomicBool::new(false));

        let sample_format = device.default_output_config()?.sample_format();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, receiver, drained.clone())?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, receiver, drained.clone())?
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &config, receiver, drained.clone())?
            }
            other => return Err(SinkError::UnsupportedFormat(format!("{:?}", other))),
        };
        stream.play()?;

        info!(device = name.as_str(), format = %format, "CPAL output stream started");
        Ok(CpalSink {
            name,
            format,
            sender: Some(sender),
            drained,
            queued_frames: 0,
            _stream: stream,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AudioSink for CpalSink {
    fn submit(&mut self, chunk: &[i16]) -> Result<usize, SinkError> {
        let sender = self.sender.as_ref().ok_or(SinkError::Closed)?;
        sender
            .send(chunk.to_vec())
            .map_err(|_| SinkError::Closed)?;

        let frames = chunk.len() / self.format.channels() as usize;
        self.queued_frames += frames as u64;
        Ok(frames)
    }

    /// Closes the channel and waits for the device to play out what was queued.
    fn finish(&mut self) -> Result<(), SinkError> {
        if self.sender.take().is_none() {
            return Ok(());
        }

        // At most QUEUED_CHUNKS chunks can still be waiting, but their size is up to the
        // caller, so bound the wait by everything that was ever queued.
        let deadline = Instant::now()
            + Duration::from_secs_f64(self.format.seconds_for_frames(self.queued_frames))
            + DRAIN_GRACE;
        while !self.drained.load(Ordering::Relaxed) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
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

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    receiver: Receiver<Vec<i16>>,
    drained: Arc<AtomicBool>,
) -> Result<cpal::Stream, SinkError>
where
    T: SizedSample + FromSample<i16> + Send + 'static,
{
    let mut feeder = Feeder::new(receiver, drained);
    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| feeder.fill(data),
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}

/// Runs inside the device callback: copies queued chunks into the device buffer and fills any
/// shortfall with silence.
struct Feeder {
    receiver: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    position: usize,
    drained: Arc<AtomicBool>,
}

impl Feeder {
    fn new(receiver: Receiver<Vec<i16>>, drained: Arc<AtomicBool>) -> Feeder {
        Feeder {
            receiver,
            pending: Vec::new(),
            position: 0,
            drained,
        }
    }

    fn fill<T: Sample + FromSample<i16>>(&mut self, data: &mut [T]) {
        let mut written = 0;
        while written < data.len() {
            if self.position >= self.pending.len() {
                match self.receiver.try_recv() {
                    Ok(chunk) => {
                        self.pending = chunk;
                        self.position = 0;
                        continue;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.drained.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }

            let count = (self.pending.len() - self.position).min(data.len() - written);
            for (dst, src) in data[written..written + count]
                .iter_mut()
                .zip(&self.pending[self.position..self.position + count])
            {
                *dst = T::from_sample(*src);
            }
            self.position += count;
            written += count;
        }

        // Zero-fill any shortfall
        data[written..].fill(T::EQUILIBRIUM);
    }
}
