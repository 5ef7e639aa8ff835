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

//! Pull-based streaming of a mixed song.
//!
//! A [SongStream] only mixes as many ticks as it needs to hand out the frames asked for. A
//! frame is finished once every tick that could still start a clip at or before it has been
//! overlaid, which is true for every frame before the onset of the next unprocessed tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, span, Level};

use super::format::OutputFormat;
use super::mixer::Mixer;
use crate::config::ConfigError;
use crate::samples::{Clip, SampleStore};
use crate::sequencer::{Song, Timeline};

/// Frames rendered per step by [SongStream::render_all].
const RENDER_CHUNK_FRAMES: usize = 4096;

/// A source of finished, interleaved 16-bit frames.
pub trait FrameSource: Send {
    /// Clears `output` and fills it with up to `max_frames` frames. Returns the number of
    /// frames written; 0 means the source is exhausted (or `max_frames` was 0).
    fn next_chunk(&mut self, output: &mut Vec<i16>, max_frames: usize) -> usize;

    /// Get the number of interleaved channels
    fn channel_count(&self) -> u16;

    /// Get the sample rate
    fn sample_rate(&self) -> u32;

    /// Total length, if known up front
    fn duration(&self) -> Option<Duration>;
}

/// Where a stream is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing has been requested yet.
    Idle,
    /// Ticks are still being mixed in.
    Producing,
    /// Every tick has been mixed; the tails of the last clips are being flushed.
    Draining,
    /// Everything has been emitted.
    Finished,
}

/// The clips that start on one tick.
#[derive(Debug, Clone)]
struct ScheduledTick {
    tick: u64,
    instruments: Vec<String>,
    clips: Vec<Arc<Clip>>,
}

/// Mixes a resolved song on demand. Restartable with [SongStream::reset], not seekable.
#[derive(Debug, Clone)]
pub struct SongStream {
    schedule: Vec<ScheduledTick>,
    format: OutputFormat,
    tick_frames: u64,
    total_ticks: u64,
    total_frames: u64,
    mixer: Mixer,
    /// The next tick to mix in.
    next_tick: u64,
    /// Index into the schedule of the next tick with triggers.
    next_scheduled: usize,
    state: StreamState,
}

impl SongStream {
    /// Prepares a stream for the resolved timeline. Every triggered instrument must have a
    /// clip in the store.
    pub fn new(
        song: &Song,
        timeline: &Timeline,
        samples: &SampleStore,
    ) -> Result<SongStream, ConfigError> {
        let format = samples.format();
        let tick_frames = song.tick_frames(format.sample_rate());
        let total_ticks = timeline.total_ticks();

        let mut total_frames = total_ticks.saturating_mul(tick_frames);
        let mut schedule = Vec::new();
        for (tick, instruments) in timeline.triggers_by_tick() {
            let clips = instruments
                .iter()
                .map(|instrument| {
                    samples
                        .get(instrument)
                        .cloned()
                        .ok_or_else(|| ConfigError::MissingSample(instrument.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            for clip in &clips {
                total_frames = total_frames
                    .max(tick.saturating_mul(tick_frames).saturating_add(clip.frames() as u64));
            }
            schedule.push(ScheduledTick {
                tick,
                instruments: instruments.into_iter().map(str::to_string).collect(),
                clips,
            });
        }

        debug!(
            format = %format,
            tick_frames,
            total_ticks,
            total_frames,
            triggered_ticks = schedule.len(),
            "Song stream prepared"
        );

        Ok(SongStream {
            schedule,
            format,
            tick_frames,
            total_ticks,
            total_frames,
            mixer: Mixer::new(format.channels()),
            next_tick: 0,
            next_scheduled: 0,
            state: StreamState::Idle,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Frames per tick, rounded once so every tick has the same length.
    pub fn tick_frames(&self) -> u64 {
        self.tick_frames
    }

    /// The length of the whole mix: every tick plus the longest tail past the last one.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frames_emitted(&self) -> u64 {
        self.mixer.origin()
    }

    /// Starts over from the first tick.
    pub fn reset(&mut self) {
        self.mixer.reset();
        self.next_tick = 0;
        self.next_scheduled = 0;
        self.set_state(StreamState::Idle);
    }

    /// Mixes the whole song from the start into one buffer.
    pub fn render_all(&mut self) -> Vec<i16> {
        self.reset();
        let mut rendered =
            Vec::with_capacity(self.total_frames as usize * self.format.channels() as usize);
        let mut chunk = Vec::with_capacity(RENDER_CHUNK_FRAMES * self.format.channels() as usize);
        while self.next_chunk(&mut chunk, RENDER_CHUNK_FRAMES) > 0 {
            rendered.extend_from_slice(&chunk);
        }
        rendered
    }

    fn set_state(&mut self, state: StreamState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Stream state changed");
            self.state = state;
        }
    }

    /// Overlays every clip triggered on the next tick.
    fn advance_tick(&mut self) {
        let tick = self.next_tick;
        if let Some(scheduled) = self
            .schedule
            .get(self.next_scheduled)
            .filter(|scheduled| scheduled.tick == tick)
        {
            let onset = tick.saturating_mul(self.tick_frames);
            for clip in &scheduled.clips {
                self.mixer.overlay(onset, clip);
            }
            debug!(
                tick,
                onset,
                instruments = scheduled.instruments.join(" "),
                "Tick"
            );
            self.next_scheduled += 1;
        }
        self.next_tick += 1;
    }

    /// The end of the range of frames that no unprocessed tick can still change.
    fn finished_until(&self) -> u64 {
        if self.next_tick < self.total_ticks {
            self.next_tick.saturating_mul(self.tick_frames)
        } else {
            self.total_frames
        }
    }
}

impl FrameSource for SongStream {
    fn next_chunk(&mut self, output: &mut Vec<i16>, max_frames: usize) -> usize {
        output.clear();
        if self.state == StreamState::Finished || max_frames == 0 {
            return 0;
        }
        if self.state == StreamState::Idle {
            self.set_state(StreamState::Producing);
        }

        let span = span!(Level::TRACE, "next chunk");
        let _enter = span.enter();

        let wanted = self.mixer.origin() + max_frames as u64;
        while self.next_tick < self.total_ticks && self.finished_until() < wanted {
            self.advance_tick();
        }
        if self.next_tick >= self.total_ticks {
            self.set_state(StreamState::Draining);
        }

        let until = self.finished_until().min(wanted);
        self.mixer.ensure_frames(until);
        let frames = self
            .mixer
            .emit((until - self.mixer.origin()) as usize, output);

        if self.state == StreamState::Draining && self.mixer.origin() >= self.total_frames {
            self.set_state(StreamState::Finished);
        }
        frames
    }

    fn channel_count(&self) -> u16 {
        self.format.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.format.sample_rate()
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.format.seconds_for_frames(self.total_frames),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::sequencer::Pattern;

    /// 60bpm with 4 ticks at 1kHz gives 250 frames per tick.
    const RATE: u32 = 1000;

    fn store(clips: &[(&str, Vec<i16>)]) -> SampleStore {
        let mut store = SampleStore::new(OutputFormat::new(RATE, 1).unwrap());
        for (name, samples) in clips {
            store.insert(name, Clip::from_interleaved(samples.clone(), 1, RATE));
        }
        store
    }

    fn stream(
        bpm: f64,
        store: &SampleStore,
        patterns: &[(&str, &[(&str, &str)])],
        sequence: &[&str],
    ) -> SongStream {
        let patterns: BTreeMap<String, Pattern> = patterns
            .iter()
            .map(|(name, lanes)| {
                let lanes = lanes
                    .iter()
                    .map(|(instrument, bars)| (instrument.to_string(), bars.to_string()))
                    .collect();
                (name.to_string(), Pattern::parse(name, &lanes, 4).unwrap())
            })
            .collect();
        let song = Song::new(
            bpm,
            4,
            sequence.iter().map(|s| s.to_string()).collect(),
            patterns,
        )
        .unwrap();
        let timeline = Timeline::resolve(&song, store).unwrap();
        SongStream::new(&song, &timeline, store).unwrap()
    }

    fn collect(stream: &mut SongStream, chunk_frames: usize) -> Vec<i16> {
        let mut all = Vec::new();
        let mut chunk = Vec::new();
        while stream.next_chunk(&mut chunk, chunk_frames) > 0 {
            all.extend_from_slice(&chunk);
        }
        all
    }

    #[test]
    fn test_length_without_tail() {
        let store = store(&[("kick", vec![100; 10])]);
        let mut stream = stream(60.0, &store, &[("p", &[("kick", "x... x...")])], &["p"]);

        assert_eq!(stream.tick_frames(), 250);
        assert_eq!(stream.total_frames(), 2000);
        assert_eq!(stream.duration(), Some(Duration::from_secs(2)));
        assert_eq!(stream.render_all().len(), 2000);
    }

    #[test]
    fn test_length_with_tail() {
        let store = store(&[("crash", vec![100; 300])]);
        let mut stream = stream(60.0, &store, &[("p", &[("crash", "...x")])], &["p"]);

        // The last tick starts at 750 and the clip rings for 300 more frames.
        assert_eq!(stream.total_frames(), 1050);
        let output = stream.render_all();
        assert_eq!(output.len(), 1050);
        assert_eq!(output[749], 0);
        assert!(output[750..].iter().all(|s| *s == 100));
    }

    #[test]
    fn test_silent_ticks() {
        let store = store(&[("kick", vec![100; 10])]);
        let mut stream = stream(60.0, &store, &[("p", &[("kick", "x...")])], &["p"]);

        let output = stream.render_all();
        assert!(output[..10].iter().all(|s| *s == 100));
        assert!(output[10..].iter().all(|s| *s == 0));
    }

    #[test]
    fn test_simultaneous_triggers_add() {
        let store = store(&[("kick", vec![100; 20]), ("snare", vec![-30; 10])]);
        let mut stream = stream(
            60.0,
            &store,
            &[("p", &[("kick", "x..."), ("snare", "x...")])],
            &["p"],
        );

        let output = stream.render_all();
        assert!(output[..10].iter().all(|s| *s == 70));
        assert!(output[10..20].iter().all(|s| *s == 100));
    }

    #[test]
    fn test_tail_overlaps_next_trigger() {
        let store = store(&[("tom", vec![1000; 300])]);
        let mut stream = stream(60.0, &store, &[("p", &[("tom", "xx..")])], &["p"]);

        let output = stream.render_all();
        assert_eq!(output[249], 1000);
        assert!(output[250..300].iter().all(|s| *s == 2000));
        assert_eq!(output[300], 1000);
        assert_eq!(output[549], 1000);
        assert_eq!(output[550], 0);
    }

    #[test]
    fn test_clamps_instead_of_wrapping() {
        let store = store(&[("a", vec![20000; 5]), ("b", vec![20000; 5]), ("c", vec![-20000; 5])]);
        let mut stream = stream(
            60.0,
            &store,
            &[("p", &[("a", "x..."), ("b", "x..."), ("c", ".x..")])],
            &["p"],
        );
        let output = stream.render_all();
        assert_eq!(output[0], i16::MAX);

        let store = self::store(&[("a", vec![-20000; 5]), ("b", vec![-20000; 5])]);
        let mut stream = self::stream(
            60.0,
            &store,
            &[("p", &[("a", "x..."), ("b", "x...")])],
            &["p"],
        );
        assert_eq!(stream.render_all()[0], i16::MIN);
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let store = store(&[("kick", vec![300; 400]), ("hat", vec![-120; 90])]);
        let patterns: &[(&str, &[(&str, &str)])] = &[
            ("a", &[("kick", "x..x ..x."), ("hat", "xxxx x.x.")]),
            ("b", &[("hat", "..x.")]),
        ];
        let mut reference = stream(93.0, &store, patterns, &["a", "b", "a"]);
        let expected = reference.render_all();

        for chunk_frames in [1, 7, 250, 1000, 100_000] {
            let mut stream = stream(93.0, &store, patterns, &["a", "b", "a"]);
            assert_eq!(collect(&mut stream, chunk_frames), expected, "{}", chunk_frames);
        }
    }

    #[test]
    fn test_deterministic() {
        let store = store(&[("kick", vec![300; 400]), ("hat", vec![-120; 90])]);
        let patterns: &[(&str, &[(&str, &str)])] =
            &[("a", &[("kick", "x..x ..x."), ("hat", "xxxx x.x.")])];
        let first = stream(111.0, &store, patterns, &["a", "a"]).render_all();
        let second = stream(111.0, &store, patterns, &["a", "a"]).render_all();
        assert_eq!(first, second);
    }

    #[test]
    fn test_states() {
        let store = store(&[("crash", vec![100; 300])]);
        let mut stream = stream(60.0, &store, &[("p", &[("crash", "...x")])], &["p"]);
        assert_eq!(stream.state(), StreamState::Idle);

        let mut chunk = Vec::new();
        assert_eq!(stream.next_chunk(&mut chunk, 100), 100);
        assert_eq!(stream.state(), StreamState::Producing);
        assert_eq!(stream.frames_emitted(), 100);

        assert_eq!(stream.next_chunk(&mut chunk, 800), 800);
        assert_eq!(stream.state(), StreamState::Draining);

        assert_eq!(stream.next_chunk(&mut chunk, 800), 150);
        assert_eq!(stream.state(), StreamState::Finished);
        assert_eq!(stream.next_chunk(&mut chunk, 800), 0);
        assert!(chunk.is_empty());
        assert_eq!(stream.state(), StreamState::Finished);
    }

    #[test]
    fn test_reset_restarts() {
        let store = store(&[("kick", vec![100; 10])]);
        let mut stream = stream(60.0, &store, &[("p", &[("kick", "x.x.")])], &["p"]);
        let first = collect(&mut stream, 64);
        assert_eq!(stream.state(), StreamState::Finished);

        stream.reset();
        assert_eq!(stream.state(), StreamState::Idle);
        assert_eq!(stream.frames_emitted(), 0);
        assert_eq!(collect(&mut stream, 64), first);
    }

    #[test]
    fn test_empty_song() {
        let store = store(&[]);
        let mut stream = stream(120.0, &store, &[], &[]);
        let mut chunk = Vec::new();
        assert_eq!(stream.next_chunk(&mut chunk, 1024), 0);
        assert_eq!(stream.state(), StreamState::Finished);
        assert_eq!(stream.total_frames(), 0);
    }

    #[test]
    fn test_missing_sample() {
        let full = store(&[("kick", vec![1; 4])]);
        let lanes = [("kick".to_string(), "x...".to_string())].into_iter().collect();
        let patterns = [("p".to_string(), Pattern::parse("p", &lanes, 4).unwrap())]
            .into_iter()
            .collect();
        let song = Song::new(120.0, 4, vec!["p".to_string()], patterns).unwrap();
        let timeline = Timeline::resolve(&song, &full).unwrap();

        assert!(matches!(
            SongStream::new(&song, &timeline, &store(&[])),
            Err(ConfigError::MissingSample(name)) if name == "kick"
        ));
    }

    #[test]
    fn test_kick_onsets_at_128_bpm() {
        let mut samples = SampleStore::new(OutputFormat::default());
        samples.insert("kick", Clip::from_interleaved(vec![1000; 200], 2, 44100));
        let lanes = [("kick".to_string(), "x... x... x... x...".to_string())]
            .into_iter()
            .collect();
        let patterns = [("pat1".to_string(), Pattern::parse("pat1", &lanes, 4).unwrap())]
            .into_iter()
            .collect();
        let song = Song::new(128.0, 4, vec!["pat1".to_string()], patterns).unwrap();
        let timeline = Timeline::resolve(&song, &samples).unwrap();
        let mut stream = SongStream::new(&song, &timeline, &samples).unwrap();

        let onsets: Vec<u64> = timeline
            .triggers()
            .map(|event| event.tick * stream.tick_frames())
            .collect();
        assert_eq!(onsets, vec![0, 20672, 41344, 62016]);
        let seconds: Vec<f64> = onsets
            .iter()
            .map(|frames| stream.format().seconds_for_frames(*frames))
            .collect();
        for (actual, expected) in seconds.iter().zip([0.0, 0.469, 0.938, 1.406]) {
            assert!((actual - expected).abs() < 0.001, "{} != {}", actual, expected);
        }

        let output = stream.render_all();
        assert_eq!(output.len(), 16 * 5168 * 2);
        for onset in onsets {
            let index = onset as usize * 2;
            assert_eq!(output[index], 1000);
            assert_eq!(output[index + 1], 1000);
            if index > 0 {
                assert_eq!(output[index - 1], 0);
            }
        }
    }
}
