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

//! The sample store: every instrument's clip, decoded and normalized to the output format.

mod clip;
mod loader;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::audio::format::OutputFormat;
use crate::audio::sample_source::SampleSourceError;

pub use clip::Clip;
pub use loader::SampleLoader;

/// Raised when an instrument's sample cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to load sample for instrument '{instrument}' from {}: {source}", path.display())]
    Decode {
        instrument: String,
        path: PathBuf,
        #[source]
        source: SampleSourceError,
    },
}

/// Instrument name to clip. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    format: OutputFormat,
    clips: BTreeMap<String, Arc<Clip>>,
}

impl SampleStore {
    /// Creates an empty store for clips in the given format.
    pub fn new(format: OutputFormat) -> SampleStore {
        SampleStore {
            format,
            clips: BTreeMap::new(),
        }
    }

    /// Loads every instrument's sample. Instruments sharing a file share the decoded clip.
    pub fn load(
        instruments: &BTreeMap<String, PathBuf>,
        format: OutputFormat,
    ) -> Result<SampleStore, LoadError> {
        let mut loader = SampleLoader::new(format);
        let mut store = SampleStore::new(format);
        for (instrument, path) in instruments {
            let clip = loader.load(path).map_err(|source| LoadError::Decode {
                instrument: instrument.clone(),
                path: path.clone(),
                source,
            })?;
            store.clips.insert(instrument.clone(), clip);
        }

        info!(
            instruments = store.len(),
            format = %format,
            memory_kb = store.memory_size() / 1024,
            "Samples loaded"
        );
        Ok(store)
    }

    /// Loads a single sample file into the store under the given name.
    pub fn load_one(&mut self, instrument: &str, path: &Path) -> Result<(), LoadError> {
        let clip = SampleLoader::new(self.format)
            .load(path)
            .map_err(|source| LoadError::Decode {
                instrument: instrument.to_string(),
                path: path.to_path_buf(),
                source,
            })?;
        self.clips.insert(instrument.to_string(), clip);
        Ok(())
    }

    /// Adds an already decoded clip.
    pub fn insert(&mut self, instrument: &str, clip: Clip) {
        self.clips.insert(instrument.to_string(), Arc::new(clip));
    }

    pub fn get(&self, instrument: &str) -> Option<&Arc<Clip>> {
        self.clips.get(instrument)
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.clips.contains_key(instrument)
    }

    /// Instrument names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Bytes held by distinct clips. Shared clips are only counted once.
    pub fn memory_size(&self) -> usize {
        let mut seen = HashSet::new();
        self.clips
            .values()
            .filter(|clip| seen.insert(Arc::as_ptr(*clip)))
            .map(|clip| clip.memory_size())
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::write_constant_wav;

    #[test]
    fn load_instruments() {
        let dir = tempfile::tempdir().unwrap();
        write_constant_wav(dir.path().join("kick.wav"), 100, 10, 1000).unwrap();
        write_constant_wav(dir.path().join("snare.wav"), 200, 5, 1000).unwrap();

        let instruments: BTreeMap<String, PathBuf> = [
            ("kick", "kick.wav"),
            ("snare", "snare.wav"),
            ("rim", "snare.wav"),
        ]
        .into_iter()
        .map(|(name, file)| (name.to_string(), dir.path().join(file)))
        .collect();
        let format = OutputFormat::new(1000, 1).unwrap();
        let store = SampleStore::load(&instruments, format).unwrap();

        assert_eq!(store.names().collect::<Vec<_>>(), vec!["kick", "rim", "snare"]);
        assert_eq!(store.format(), format);
        assert_eq!(store.get("kick").unwrap().frames(), 10);
        assert_eq!(store.get("snare").unwrap().samples()[0], 200);
        assert!(Arc::ptr_eq(
            store.get("rim").unwrap(),
            store.get("snare").unwrap()
        ));
        assert_eq!(store.memory_size(), (10 + 5) * 2);
    }

    #[test]
    fn load_failure_names_instrument() {
        let dir = tempfile::tempdir().unwrap();
        let instruments: BTreeMap<String, PathBuf> =
            [("kick".to_string(), dir.path().join("missing.wav"))]
                .into_iter()
                .collect();

        let err = SampleStore::load(&instruments, OutputFormat::default()).unwrap_err();
        let LoadError::Decode { instrument, .. } = &err;
        assert_eq!(instrument, "kick");
        assert!(err.to_string().contains("missing.wav"));
    }

    #[test]
    fn insert_and_load_one() {
        let dir = tempfile::tempdir().unwrap();
        write_constant_wav(dir.path().join("clap.wav"), -50, 3, 44100).unwrap();

        let mut store = SampleStore::default();
        assert!(store.is_empty());
        store.insert("kick", Clip::from_interleaved(vec![1, 1], 2, 44100));
        store
            .load_one("clap", &dir.path().join("clap.wav"))
            .unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains("clap"));
        assert!(!store.contains("snare"));
        assert_eq!(store.get("clap").unwrap().samples(), &[-50; 6]);
    }
}
