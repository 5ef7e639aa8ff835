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
use tracing::debug;

use super::song::Song;
use crate::config::ConfigError;
use crate::samples::SampleStore;

/// A single instrument's state at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    pub instrument: String,
    pub tick: u64,
    pub trigger: bool,
}

/// A song flattened into absolute ticks.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    /// Ordered by tick, then by instrument name.
    events: Vec<TickEvent>,
    total_ticks: u64,
}

impl Timeline {
    /// Resolves the song's pattern sequence against the loaded samples. Each pattern starts
    /// where the previous one ended.
    pub fn resolve(song: &Song, samples: &SampleStore) -> Result<Timeline, ConfigError> {
        let mut events = Vec::new();
        let mut offset = 0u64;

        for (index, name) in song.sequence().iter().enumerate() {
            let pattern = song
                .pattern(name)
                .ok_or_else(|| ConfigError::UndefinedPattern(name.clone()))?;
            if let Some(instrument) = pattern
                .instruments()
                .find(|instrument| !samples.contains(instrument))
            {
                return Err(ConfigError::UndefinedInstrument {
                    pattern: name.clone(),
                    instrument: instrument.to_string(),
                });
            }

            debug!(
                pattern = name,
                index,
                start_tick = offset,
                ticks = pattern.tick_count(),
                "Resolving pattern"
            );
            for tick in 0..pattern.tick_count() {
                for instrument in pattern.instruments() {
                    events.push(TickEvent {
                        instrument: instrument.to_string(),
                        tick: offset + tick as u64,
                        trigger: pattern.is_triggered(instrument, tick),
                    });
                }
            }
            offset += pattern.tick_count() as u64;
        }

        Ok(Timeline {
            events,
            total_ticks: offset,
        })
    }

    pub fn events(&self) -> &[TickEvent] {
        &self.events
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Only the events that start a clip.
    pub fn triggers(&self) -> impl Iterator<Item = &TickEvent> {
        self.events.iter().filter(|event| event.trigger)
    }

    /// Triggered instruments grouped by tick, skipping ticks where nothing plays.
    pub fn triggers_by_tick(&self) -> Vec<(u64, Vec<&str>)> {
        let mut grouped: Vec<(u64, Vec<&str>)> = Vec::new();
        for event in self.triggers() {
            match grouped.last_mut() {
                Some((tick, instruments)) if *tick == event.tick => {
                    instruments.push(event.instrument.as_str())
                }
                _ => grouped.push((event.tick, vec![event.instrument.as_str()])),
            }
        }
        grouped
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::samples::Clip;
    use crate::sequencer::Pattern;

    fn store(instruments: &[&str]) -> SampleStore {
        let mut store = SampleStore::default();
        for instrument in instruments {
            store.insert(instrument, Clip::from_interleaved(vec![1000; 4], 2, 44100));
        }
        store
    }

    fn song(sequence: &[&str]) -> Song {
        let patterns: BTreeMap<String, Pattern> = [
            ("intro", vec![("kick", "x... x...")]),
            ("beat", vec![("snare", "..x."), ("kick", "x.x.")]),
        ]
        .into_iter()
        .map(|(name, lanes)| {
            let lanes = lanes
                .into_iter()
                .map(|(instrument, bars)| (instrument.to_string(), bars.to_string()))
                .collect();
            (name.to_string(), Pattern::parse(name, &lanes, 4).unwrap())
        })
        .collect();
        Song::new(
            128.0,
            4,
            sequence.iter().map(|s| s.to_string()).collect(),
            patterns,
        )
        .unwrap()
    }

    #[test]
    fn resolve_concatenates_patterns() {
        let timeline =
            Timeline::resolve(&song(&["intro", "beat", "intro"]), &store(&["kick", "snare"]))
                .unwrap();

        assert_eq!(timeline.total_ticks(), 20);
        // intro has one lane for 8 ticks, beat two lanes for 4.
        assert_eq!(timeline.events().len(), 8 + 8 + 8);
        assert_eq!(
            timeline.triggers_by_tick(),
            vec![
                (0, vec!["kick"]),
                (4, vec!["kick"]),
                (8, vec!["kick"]),
                (10, vec!["kick", "snare"]),
                (12, vec!["kick"]),
                (16, vec!["kick"]),
            ]
        );
    }

    #[test]
    fn events_are_ordered() {
        let timeline = Timeline::resolve(&song(&["beat"]), &store(&["kick", "snare"])).unwrap();
        let order: Vec<(u64, &str)> = timeline
            .events()
            .iter()
            .map(|event| (event.tick, event.instrument.as_str()))
            .collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(
            timeline.events()[5],
            TickEvent {
                instrument: "snare".to_string(),
                tick: 2,
                trigger: true
            }
        );
    }

    #[test]
    fn missing_sample() {
        assert!(matches!(
            Timeline::resolve(&song(&["intro", "beat"]), &store(&["kick"])),
            Err(ConfigError::UndefinedInstrument { pattern, instrument })
                if pattern == "beat" && instrument == "snare"
        ));
    }

    #[test]
    fn empty_song() {
        let timeline = Timeline::resolve(&song(&[]), &store(&[])).unwrap();
        assert_eq!(timeline.total_ticks(), 0);
        assert!(timeline.events().is_empty());
        assert!(timeline.triggers_by_tick().is_empty());
    }
}
