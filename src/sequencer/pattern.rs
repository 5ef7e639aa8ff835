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
use std::collections::BTreeMap;
use std::fmt;

use crate::config::ConfigError;

/// The character used for a rest. Any other non-whitespace character is a trigger.
pub const REST: char = '.';

/// One cycle of ticks for one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    steps: Vec<bool>,
}

impl Bar {
    pub fn new(steps: Vec<bool>) -> Bar {
        Bar { steps }
    }

    /// A bar that never triggers.
    pub fn rest(ticks: u32) -> Bar {
        Bar {
            steps: vec![false; ticks as usize],
        }
    }

    pub fn steps(&self) -> &[bool] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", if *step { 'x' } else { REST })?;
        }
        Ok(())
    }
}

/// A named set of instrument lanes, each made of one or more bars. Every lane has the same
/// number of ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    name: String,
    ticks_per_bar: u32,
    lanes: BTreeMap<String, Vec<Bar>>,
    tick_count: usize,
}

impl Pattern {
    /// Creates a pattern from lanes of bars, checking that every bar holds `ticks_per_bar`
    /// ticks and that every lane has the same number of bars.
    pub fn new(
        name: &str,
        ticks_per_bar: u32,
        lanes: BTreeMap<String, Vec<Bar>>,
    ) -> Result<Pattern, ConfigError> {
        let mut tick_count = None;
        for (instrument, bars) in &lanes {
            let length: usize = bars.iter().map(Bar::len).sum();
            if length == 0 || bars.iter().any(|bar| bar.len() != ticks_per_bar as usize) {
                return Err(ConfigError::BarLength {
                    pattern: name.to_string(),
                    instrument: instrument.clone(),
                    length,
                    ticks: ticks_per_bar,
                });
            }
            match tick_count {
                Some(count) if count != length => {
                    return Err(ConfigError::UnequalBars {
                        pattern: name.to_string(),
                        instrument: instrument.clone(),
                    })
                }
                _ => tick_count = Some(length),
            }
        }

        let tick_count = tick_count.ok_or_else(|| ConfigError::EmptyPattern(name.to_string()))?;
        Ok(Pattern {
            name: name.to_string(),
            ticks_per_bar,
            lanes,
            tick_count,
        })
    }

    /// Parses ASCII bar strings such as `x... x... x... x...`. Whitespace only groups ticks
    /// visually and is dropped.
    pub fn parse(
        name: &str,
        lanes: &BTreeMap<String, String>,
        ticks_per_bar: u32,
    ) -> Result<Pattern, ConfigError> {
        if ticks_per_bar == 0 {
            return Err(ConfigError::InvalidTicks(0));
        }

        let mut parsed = BTreeMap::new();
        for (instrument, text) in lanes {
            let steps: Vec<bool> = text
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c != REST)
                .collect();
            if steps.is_empty() || steps.len() % ticks_per_bar as usize != 0 {
                return Err(ConfigError::BarLength {
                    pattern: name.to_string(),
                    instrument: instrument.clone(),
                    length: steps.len(),
                    ticks: ticks_per_bar,
                });
            }
            let bars = steps
                .chunks(ticks_per_bar as usize)
                .map(|chunk| Bar::new(chunk.to_vec()))
                .collect();
            parsed.insert(instrument.clone(), bars);
        }

        Pattern::new(name, ticks_per_bar, parsed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ticks_per_bar(&self) -> u32 {
        self.ticks_per_bar
    }

    /// Total ticks across all bars.
    pub fn tick_count(&self) -> usize {
        self.tick_count
    }

    pub fn bar_count(&self) -> usize {
        self.tick_count / self.ticks_per_bar as usize
    }

    /// Instruments with a lane in this pattern, sorted by name.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.lanes.keys().map(String::as_str)
    }

    pub fn bars(&self, instrument: &str) -> Option<&[Bar]> {
        self.lanes.get(instrument).map(Vec::as_slice)
    }

    /// Whether the instrument triggers on the given tick. Instruments without a lane rest.
    pub fn is_triggered(&self, instrument: &str, tick: usize) -> bool {
        let ticks_per_bar = self.ticks_per_bar as usize;
        self.lanes
            .get(instrument)
            .and_then(|bars| bars.get(tick / ticks_per_bar))
            .and_then(|bar| bar.steps().get(tick % ticks_per_bar))
            .copied()
            .unwrap_or(false)
    }

    /// Instruments triggering on the given tick, sorted by name.
    pub fn triggered_at(&self, tick: usize) -> Vec<&str> {
        self.instruments()
            .filter(|instrument| self.is_triggered(instrument, tick))
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PATTERN {} ({} bars, {} ticks)", self.name, self.bar_count(), self.tick_count)?;
        for (instrument, bars) in &self.lanes {
            let bars: Vec<String> = bars.iter().map(Bar::to_string).collect();
            writeln!(f, "{:>15} = {}", instrument, bars.join(" "))?;
        }
        Ok(())
    }
}
