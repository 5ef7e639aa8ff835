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
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use super::pattern::Pattern;
use crate::config::ConfigError;

/// The longest tick a song may have. Anything slower is treated as an invalid tempo.
pub const MAX_TICK_SECONDS: f64 = 60.0;

/// A tempo, a resolution and the patterns to play, in order.
#[derive(Debug, Clone)]
pub struct Song {
    bpm: f64,
    ticks_per_bar: u32,
    sequence: Vec<String>,
    patterns: BTreeMap<String, Pattern>,
}

impl Song {
    /// Creates a validated song. Every pattern in the sequence must be defined and share the
    /// song's ticks per bar.
    pub fn new(
        bpm: f64,
        ticks_per_bar: u32,
        sequence: Vec<String>,
        patterns: BTreeMap<String, Pattern>,
    ) -> Result<Song, ConfigError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::InvalidTempo(bpm));
        }
        if ticks_per_bar == 0 {
            return Err(ConfigError::InvalidTicks(0));
        }
        if 60.0 / bpm / ticks_per_bar as f64 > MAX_TICK_SECONDS {
            return Err(ConfigError::InvalidTempo(bpm));
        }
        for name in &sequence {
            let pattern = patterns
                .get(name)
                .ok_or_else(|| ConfigError::UndefinedPattern(name.clone()))?;
            if pattern.ticks_per_bar() != ticks_per_bar {
                return Err(ConfigError::TicksMismatch {
                    pattern: name.clone(),
                    expected: ticks_per_bar,
                    actual: pattern.ticks_per_bar(),
                });
            }
        }

        Ok(Song {
            bpm,
            ticks_per_bar,
            sequence,
            patterns,
        })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.ticks_per_bar
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// The patterns in play order. Repeated patterns appear once per repeat.
    pub fn sequenced_patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.sequence
            .iter()
            .filter_map(|name| self.patterns.get(name))
    }

    /// One beat divided by the ticks per bar.
    pub fn tick_seconds(&self) -> f64 {
        60.0 / self.bpm / self.ticks_per_bar as f64
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_seconds())
    }

    /// Frames in one tick at the given sample rate. Every tick gets the same rounded length
    /// so onsets never drift.
    pub fn tick_frames(&self, sample_rate: u32) -> u64 {
        (self.tick_seconds() * sample_rate as f64).round() as u64
    }

    pub fn total_ticks(&self) -> u64 {
        self.sequenced_patterns()
            .map(|pattern| pattern.tick_count() as u64)
            .sum()
    }

    /// Length of the sequence without any sample tails.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_seconds() * self.total_ticks() as f64)
    }

    /// Every instrument that some sequenced pattern has a lane for.
    pub fn used_instruments(&self) -> BTreeSet<&str> {
        self.sequenced_patterns()
            .flat_map(|pattern| pattern.instruments())
            .collect()
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SONG {} bpm, {} ticks per bar, {} ticks",
            self.bpm,
            self.ticks_per_bar,
            self.total_ticks()
        )?;
        writeln!(f, "SEQUENCE {}", self.sequence.join(" "))?;
        for pattern in self.patterns.values() {
            write!(f, "{}", pattern)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pattern(name: &str, lanes: &[(&str, &str)]) -> Pattern {
        let lanes = lanes
            .iter()
            .map(|(instrument, bars)| (instrument.to_string(), bars.to_string()))
            .collect();
        Pattern::parse(name, &lanes, 4).unwrap()
    }

    fn song(sequence: &[&str]) -> Result<Song, ConfigError> {
        let patterns = [
            pattern("a", &[("kick", "x... x...")]),
            pattern("b", &[("snare", "..x.")]),
        ]
        .into_iter()
        .map(|p| (p.name().to_string(), p))
        .collect();
        Song::new(
            128.0,
            4,
            sequence.iter().map(|s| s.to_string()).collect(),
            patterns,
        )
    }

    #[test]
    fn timing() {
        let song = song(&["a", "b", "a"]).unwrap();
        assert!((song.tick_seconds() - 0.1171875).abs() < 1e-12);
        assert_eq!(song.tick_frames(44100), 5168);
        assert_eq!(song.total_ticks(), 20);
        assert_eq!(song.duration(), Duration::from_secs_f64(0.1171875 * 20.0));
        assert_eq!(
            song.used_instruments().into_iter().collect::<Vec<_>>(),
            vec!["kick", "snare"]
        );
    }

    #[test]
    fn empty_sequence() {
        let song = song(&[]).unwrap();
        assert_eq!(song.total_ticks(), 0);
        assert!(song.used_instruments().is_empty());
    }

    #[test]
    fn undefined_pattern() {
        assert!(matches!(
            song(&["a", "c"]),
            Err(ConfigError::UndefinedPattern(name)) if name == "c"
        ));
    }

    #[test]
    fn invalid_tempo() {
        for bpm in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Song::new(bpm, 4, vec![], BTreeMap::new()),
                Err(ConfigError::InvalidTempo(_))
            ));
        }
        assert!(matches!(
            Song::new(120.0, 0, vec![], BTreeMap::new()),
            Err(ConfigError::InvalidTicks(0))
        ));
    }

    #[test]
    fn tempo_too_slow() {
        for bpm in [1e-12, 0.5] {
            assert!(matches!(
                Song::new(bpm, 1, vec![], BTreeMap::new()),
                Err(ConfigError::InvalidTempo(_))
            ));
        }
        // Exactly one minute per tick is still allowed.
        let song = Song::new(1.0, 1, vec![], BTreeMap::new()).unwrap();
        assert_eq!(song.tick_frames(44100), 44100 * 60);
    }

    #[test]
    fn ticks_mismatch() {
        let lanes = [("kick".to_string(), "x.x".to_string())].into_iter().collect();
        let triplets = Pattern::parse("t", &lanes, 3).unwrap();
        let patterns = [("t".to_string(), triplets)].into_iter().collect();
        assert!(matches!(
            Song::new(120.0, 4, vec!["t".to_string()], patterns),
            Err(ConfigError::TicksMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }
}
