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

use tracing::{info, span, Level, Span};

use crate::audio::{AudioSink, FrameSource, SinkError};
use crate::playsync::CancelHandle;

/// Frames pulled from the source per chunk unless told otherwise.
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// What a playback run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames: u64,
    pub chunks: u64,
    pub cancelled: bool,
}

/// Pulls chunks from a frame source and pushes them into a sink until the source runs dry or
/// playback is cancelled.
pub struct Player {
    chunk_frames: usize,
    /// The logging span.
    span: Span,
}

impl Player {
    /// Creates a new player.
    pub fn new(chunk_frames: usize) -> Player {
        Player {
            chunk_frames: chunk_frames.max(1),
            span: span!(Level::INFO, "player"),
        }
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    /// Plays the source into the sink. The sink is finished even if playback was cancelled.
    pub fn play(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn AudioSink,
        cancel_handle: &CancelHandle,
    ) -> Result<PlaybackSummary, SinkError> {
        let _enter = self.span.enter();
        if source.channel_count() != sink.channel_count() {
            return Err(SinkError::ChannelMismatch {
                expected: sink.channel_count(),
                actual: source.channel_count(),
            });
        }

        info!(
            chunk_frames = self.chunk_frames,
            duration = ?source.duration().unwrap_or(Duration::ZERO),
            "Playback started"
        );

        let mut summary = PlaybackSummary {
            frames: 0,
            chunks: 0,
            cancelled: false,
        };
        let mut chunk = Vec::with_capacity(self.chunk_frames * source.channel_count() as usize);
        loop {
            if cancel_handle.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if source.next_chunk(&mut chunk, self.chunk_frames) == 0 {
                break;
            }
            summary.frames += sink.submit(&chunk)? as u64;
            summary.chunks += 1;
        }
        sink.finish()?;

        info!(
            frames = summary.frames,
            chunks = summary.chunks,
            cancelled = summary.cancelled,
            "Playback finished"
        );
        Ok(summary)
    }
}

impl Default for Player {
    fn default() -> Self {
        Player::new(DEFAULT_CHUNK_FRAMES)
    }
}
