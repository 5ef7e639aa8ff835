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
use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::ConfigError;
use crate::sequencer::{Pattern, Song};

/// Tempo used when a track has no [song] section.
pub const DEFAULT_BPM: f64 = 128.0;

/// Resolution used when a track has no [song] section.
pub const DEFAULT_TICKS: i64 = 4;

/// A track definition as it appears on disk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackFile {
    /// Where the sample files live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paths: Option<Paths>,
    /// Instrument name to sample file, relative to the sample directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    samples: Option<BTreeMap<String, String>>,
    /// Tempo, resolution and pattern sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    song: Option<SongSection>,
    /// Pattern name to instrument bars. Comes from the [pattern.<name>] sections.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pattern: BTreeMap<String, BTreeMap<String, String>>,
    /// The file this track was read from.
    #[serde(skip)]
    track_file: PathBuf,
}

/// The [paths] section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Paths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    samples: Option<String>,
}

/// The [song] section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongSection {
    #[serde(default = "default_bpm")]
    bpm: f64,
    #[serde(default = "default_ticks")]
    ticks: i64,
    /// Whitespace separated pattern names, played in order.
    #[serde(default)]
    patterns: String,
}

fn default_bpm() -> f64 {
    DEFAULT_BPM
}

fn default_ticks() -> i64 {
    DEFAULT_TICKS
}

impl Default for SongSection {
    fn default() -> Self {
        SongSection {
            bpm: DEFAULT_BPM,
            ticks: DEFAULT_TICKS,
            patterns: String::new(),
        }
    }
}

impl TrackFile {
    /// Deserializes a track file. The format is picked from the file extension.
    pub fn deserialize(path: &Path) -> Result<TrackFile, ConfigError> {
        let mut track = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<TrackFile>()?;
        if track.samples.is_none() {
            return Err(ConfigError::MissingSection("samples".to_string()));
        }
        track.track_file = path.to_path_buf();

        info!(
            path = ?path,
            instruments = track.instruments().len(),
            patterns = track.pattern.len(),
            "Track file loaded"
        );
        Ok(track)
    }

    /// The directory sample files are resolved against. Relative sample directories are
    /// relative to the track file.
    pub fn samples_dir(&self) -> PathBuf {
        let track_dir = self
            .track_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        match self.paths.as_ref().and_then(|paths| paths.samples.as_ref()) {
            Some(samples) if Path::new(samples).is_absolute() => PathBuf::from(samples),
            Some(samples) => track_dir.join(samples),
            None => track_dir,
        }
    }

    /// Instrument names mapped to the full path of their sample files.
    pub fn sample_paths(&self) -> BTreeMap<String, PathBuf> {
        let samples_dir = self.samples_dir();
        self.samples
            .iter()
            .flatten()
            .map(|(name, file)| (name.clone(), samples_dir.join(file)))
            .collect()
    }

    /// The declared instrument names, sorted.
    pub fn instruments(&self) -> Vec<&str> {
        self.samples
            .iter()
            .flatten()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The defined pattern names, sorted.
    pub fn pattern_names(&self) -> Vec<&str> {
        self.pattern.keys().map(String::as_str).collect()
    }

    pub fn bpm(&self) -> f64 {
        self.song.as_ref().map(|song| song.bpm).unwrap_or(DEFAULT_BPM)
    }

    pub fn ticks(&self) -> i64 {
        self.song
            .as_ref()
            .map(|song| song.ticks)
            .unwrap_or(DEFAULT_TICKS)
    }

    /// The song's pattern sequence. Empty if the track has no [song] section.
    pub fn pattern_sequence(&self) -> Vec<String> {
        self.song
            .as_ref()
            .map(|song| song.patterns.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Replaces the song's pattern sequence.
    pub fn set_pattern_sequence(&mut self, sequence: &[String]) {
        self.song.get_or_insert_with(SongSection::default).patterns = sequence.join(" ");
    }

    /// Instruments that no pattern in the sequence ever references.
    pub fn unused_instruments(&self) -> BTreeSet<String> {
        let mut unused: BTreeSet<String> = self
            .instruments()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in self.pattern_sequence() {
            if let Some(lanes) = self.pattern.get(&name) {
                lanes.keys().for_each(|instrument| {
                    unused.remove(instrument);
                });
            }
        }
        unused
    }

    /// Drops unused instruments so their samples are never loaded. Returns the dropped names.
    pub fn discard_unused_instruments(&mut self) -> BTreeSet<String> {
        let unused = self.unused_instruments();
        if unused.is_empty() {
            return unused;
        }

        if let Some(samples) = self.samples.as_mut() {
            samples.retain(|name, _| !unused.contains(name));
        }
        warn!(
            instruments = unused.iter().cloned().collect::<Vec<_>>().join(", "),
            "Unused instruments were discarded"
        );
        unused
    }

    /// Parses a single pattern definition.
    pub fn pattern(&self, name: &str) -> Result<Pattern, ConfigError> {
        let lanes = self
            .pattern
            .get(name)
            .ok_or_else(|| ConfigError::UndefinedPattern(name.to_string()))?;
        let samples = self.samples.as_ref();
        if let Some(instrument) = lanes
            .keys()
            .find(|instrument| !samples.is_some_and(|samples| samples.contains_key(*instrument)))
        {
            return Err(ConfigError::UndefinedInstrument {
                pattern: name.to_string(),
                instrument: instrument.clone(),
            });
        }
        Pattern::parse(name, lanes, self.validated_ticks()?)
    }

    /// Parses every defined pattern, whether or not the song plays it.
    pub fn all_patterns(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.pattern.keys().map(|name| self.pattern(name)).collect()
    }

    /// Validates the song and every pattern it plays.
    pub fn to_song(&self) -> Result<Song, ConfigError> {
        let sequence = self.pattern_sequence();
        let mut patterns = BTreeMap::new();
        for name in &sequence {
            if !patterns.contains_key(name) {
                patterns.insert(name.clone(), self.pattern(name)?);
            }
        }
        Song::new(self.bpm(), self.validated_ticks()?, sequence, patterns)
    }

    fn validated_ticks(&self) -> Result<u32, ConfigError> {
        let ticks = self.ticks();
        u32::try_from(ticks)
            .ok()
            .filter(|ticks| *ticks > 0)
            .ok_or(ConfigError::InvalidTicks(ticks))
    }

    /// Saves the track definition as YAML. The sample directory is written out absolute so
    /// the file can be loaded from anywhere.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut track = self.clone();
        track.paths = Some(Paths {
            samples: Some(self.samples_dir().display().to_string()),
        });
        let serialized = serde_yml::to_string(&track)?;
        fs::write(path, serialized)?;

        info!(path = ?path, "Track saved");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use config::{Config, File, FileFormat};

    use super::*;

    const TRACK_INI: &str = r#"
[paths]
samples = drums

[samples]
kick = kick.wav
snare = snare.wav
hihat = hihat.wav

[song]
bpm = 120
ticks = 4
patterns = intro beat beat

[pattern.intro]
kick = x... x... x... x...

[pattern.beat]
kick  = x... x... x... x...
snare = .... x... .... x...
"#;

    fn parse(contents: &str, format: FileFormat, track_file: &str) -> TrackFile {
        let mut track: TrackFile = Config::builder()
            .add_source(File::from_str(contents, format))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        track.track_file = PathBuf::from(track_file);
        track
    }

    #[test]
    fn ini_track() {
        let track = parse(TRACK_INI, FileFormat::Ini, "/tracks/demo.ini");

        assert_eq!(track.instruments(), vec!["hihat", "kick", "snare"]);
        assert_eq!(track.pattern_names(), vec!["beat", "intro"]);
        assert_eq!(track.bpm(), 120.0);
        assert_eq!(track.ticks(), 4);
        assert_eq!(track.pattern_sequence(), vec!["intro", "beat", "beat"]);
        assert_eq!(track.samples_dir(), PathBuf::from("/tracks/drums"));
        assert_eq!(
            track.sample_paths().get("kick"),
            Some(&PathBuf::from("/tracks/drums/kick.wav"))
        );

        let song = track.to_song().unwrap();
        assert_eq!(song.total_ticks(), 48);
        let beat = song.pattern("beat").unwrap();
        assert!(beat.is_triggered("snare", 4));
        assert!(!beat.is_triggered("snare", 0));
    }

    #[test]
    fn yaml_track() {
        let track = parse(
            r#"
paths:
  samples: /opt/samples
samples:
  kick: kick.wav
song:
  bpm: 100
  patterns: one
pattern:
  one:
    kick: "x.x."
"#,
            FileFormat::Yaml,
            "/tracks/demo.yaml",
        );

        assert_eq!(track.samples_dir(), PathBuf::from("/opt/samples"));
        assert_eq!(track.bpm(), 100.0);
        // Missing ticks falls back to the default.
        assert_eq!(track.ticks(), DEFAULT_TICKS);
        let song = track.to_song().unwrap();
        assert_eq!(song.total_ticks(), 4);
    }

    #[test]
    fn no_song_section() {
        let track = parse(
            "[samples]\nkick = kick.wav\n",
            FileFormat::Ini,
            "/tracks/demo.ini",
        );

        assert_eq!(track.bpm(), DEFAULT_BPM);
        assert_eq!(track.ticks(), DEFAULT_TICKS);
        assert!(track.pattern_sequence().is_empty());
        assert_eq!(track.samples_dir(), PathBuf::from("/tracks"));
        assert_eq!(track.to_song().unwrap().total_ticks(), 0);
    }

    #[test]
    fn undefined_pattern() {
        let mut track = parse(TRACK_INI, FileFormat::Ini, "/tracks/demo.ini");
        track.set_pattern_sequence(&["beat".to_string(), "outro".to_string()]);

        assert!(matches!(
            track.to_song(),
            Err(ConfigError::UndefinedPattern(name)) if name == "outro"
        ));
    }

    #[test]
    fn undefined_instrument() {
        let track = parse(
            "[samples]\nkick = kick.wav\n[song]\npatterns = one\n[pattern.one]\ncowbell = x...\n",
            FileFormat::Ini,
            "/tracks/demo.ini",
        );

        assert!(matches!(
            track.to_song(),
            Err(ConfigError::UndefinedInstrument { pattern, instrument })
                if pattern == "one" && instrument == "cowbell"
        ));
    }

    #[test]
    fn invalid_tempo_and_ticks() {
        let track = parse(
            "[samples]\nkick = kick.wav\n[song]\nbpm = 0\n",
            FileFormat::Ini,
            "/tracks/demo.ini",
        );
        assert!(matches!(track.to_song(), Err(ConfigError::InvalidTempo(_))));

        let track = parse(
            "[samples]\nkick = kick.wav\n[song]\nticks = -2\n",
            FileFormat::Ini,
            "/tracks/demo.ini",
        );
        assert!(matches!(
            track.to_song(),
            Err(ConfigError::InvalidTicks(-2))
        ));
    }

    #[test]
    fn unused_instruments_are_discarded() {
        let mut track = parse(TRACK_INI, FileFormat::Ini, "/tracks/demo.ini");

        let unused = track.discard_unused_instruments();
        assert_eq!(unused.into_iter().collect::<Vec<_>>(), vec!["hihat"]);
        assert_eq!(track.instruments(), vec!["kick", "snare"]);
        assert!(track.sample_paths().get("hihat").is_none());

        // Only the sequence counts, so dropping "beat" leaves snare unused too.
        track.set_pattern_sequence(&["intro".to_string()]);
        assert_eq!(
            track.unused_instruments().into_iter().collect::<Vec<_>>(),
            vec!["snare"]
        );
    }

    #[test]
    fn missing_samples_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.ini");
        std::fs::write(&path, "[song]\nbpm = 120\n").unwrap();

        assert!(matches!(
            TrackFile::deserialize(&path),
            Err(ConfigError::MissingSection(section)) if section == "samples"
        ));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let ini_path = dir.path().join("track.ini");
        std::fs::write(&ini_path, TRACK_INI).unwrap();

        let track = TrackFile::deserialize(&ini_path).unwrap();
        let yaml_path = dir.path().join("saved").join("track.yaml");
        std::fs::create_dir(dir.path().join("saved")).unwrap();
        track.save(&yaml_path).unwrap();

        let reloaded = TrackFile::deserialize(&yaml_path).unwrap();
        assert_eq!(reloaded.samples_dir(), dir.path().join("drums"));
        assert_eq!(reloaded.sample_paths(), track.sample_paths());
        assert_eq!(reloaded.pattern_sequence(), track.pattern_sequence());
        assert_eq!(reloaded.bpm(), track.bpm());
        assert_eq!(
            reloaded.to_song().unwrap().to_string(),
            track.to_song().unwrap().to_string()
        );
    }
}
