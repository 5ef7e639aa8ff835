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

//! Destinations for mixed audio. A sink only ever sees finished, interleaved 16-bit chunks, so
//! the mixer doesn't care whether they end up in a file, on a device or in memory.

mod cpal;
mod error;
mod memory;
mod wav;

pub use self::cpal::{list_devices, CpalSink, DeviceInfo};
pub use error::SinkError;
pub use memory::MemorySink;
pub use wav::WavSink;

pub trait AudioSink {
    /// Consumes a chunk of interleaved samples. Returns the number of frames accepted.
    fn submit(&mut self, chunk: &[i16]) -> Result<usize, SinkError>;

    /// Flushes anything buffered. Nothing can be submitted afterwards.
    fn finish(&mut self) -> Result<(), SinkError>;

    /// Interleaved channels per frame this sink expects.
    fn channel_count(&self) -> u16;

    fn sample_rate(&self) -> u32;
}
