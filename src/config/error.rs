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
/// Errors raised while reading or validating a track definition. None of these can occur once
/// mixing has started.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Track file has no [{0}] section")]
    MissingSection(String),

    #[error("Pattern definition not found: {0}")]
    UndefinedPattern(String),

    #[error("Instrument '{instrument}' not defined (pattern: {pattern})")]
    UndefinedInstrument { pattern: String, instrument: String },

    #[error(
        "Bars must be a non-zero multiple of {ticks} ticks, {pattern}.{instrument} has {length}"
    )]
    BarLength {
        pattern: String,
        instrument: String,
        length: usize,
        ticks: u32,
    },

    #[error("All bars must be of equal length in the same pattern ({pattern}.{instrument})")]
    UnequalBars { pattern: String, instrument: String },

    #[error("No sample loaded for instrument '{0}'")]
    MissingSample(String),

    #[error("Pattern '{0}' has no instruments")]
    EmptyPattern(String),

    #[error("Pattern '{pattern}' uses {actual} ticks per bar, song uses {expected}")]
    TicksMismatch {
        pattern: String,
        expected: u32,
        actual: u32,
    },

    #[error("Tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),

    #[error("Ticks per bar must be positive, got {0}")]
    InvalidTicks(i64),

    #[error("Invalid output format: {0}")]
    InvalidOutputFormat(String),

    #[error("Unable to serialize track: {0}")]
    Serialize(#[from] serde_yml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
