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

//! Locating and loading authored sound assets.
//!
//! Assets are found by name with a fixed extension and loaded entirely into
//! memory, resampled to the output rate, so playback never touches the disk.

use std::path::{Path, PathBuf};

use tracing::info;

use super::buffer::{PcmBuffer, ResampleError};
use super::decoder::{decode_file, DecodeError};
use crate::config::samples::SamplesConfig;

/// Reasons an authored asset could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("No asset file for sound {name}")]
    Missing { name: String, path: Option<PathBuf> },

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("Failed to resample {}: {source}", path.display())]
    Resample {
        path: PathBuf,
        #[source]
        source: ResampleError,
    },
}

/// Resolves sound names to files and decodes them.
pub struct AssetLoader {
    /// Directory holding the authored assets, if any.
    directory: Option<PathBuf>,
    /// Extension appended to the sound name.
    extension: String,
    /// Output sample rate that loaded assets are converted to.
    target_sample_rate: u32,
}

impl AssetLoader {
    /// Creates a new asset loader.
    pub fn new(config: &SamplesConfig, target_sample_rate: u32) -> Self {
        Self {
            directory: config.directory().map(Path::to_path_buf),
            extension: config.extension().to_string(),
            target_sample_rate,
        }
    }

    /// Returns the path an asset with the given name would live at.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", name, self.extension)))
    }

    /// Loads the asset for `name` into memory.
    pub fn load(&self, name: &str) -> Result<PcmBuffer, LoadError> {
        let path = match self.path_for(name) {
            Some(path) if path.is_file() => path,
            path => {
                return Err(LoadError::Missing {
                    name: name.to_string(),
                    path,
                })
            }
        };

        let decoded = decode_file(&path).map_err(|source| LoadError::Decode {
            path: path.clone(),
            source,
        })?;

        let buffer = if decoded.sample_rate() != self.target_sample_rate {
            info!(
                sound = name,
                source_rate = decoded.sample_rate(),
                target_rate = self.target_sample_rate,
                "Transcoding asset"
            );
            decoded
                .resample(self.target_sample_rate)
                .map_err(|source| LoadError::Resample {
                    path: path.clone(),
                    source,
                })?
        } else {
            decoded
        };

        info!(
            sound = name,
            path = ?path,
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            duration_ms = buffer.duration().as_millis(),
            memory_kb = buffer.memory_size() / 1024,
            "Asset loaded"
        );

        Ok(buffer)
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("directory", &self.directory)
            .field("extension", &self.extension)
            .field("target_sample_rate", &self.target_sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::write_wav;
    use tempfile::tempdir;

    fn loader_for(dir: &Path, extension: &str, rate: u32) -> AssetLoader {
        AssetLoader::new(&SamplesConfig::new(Some(dir), extension), rate)
    }

    #[test]
    fn test_missing_without_directory() {
        let loader = AssetLoader::new(&SamplesConfig::default(), 44100);
        assert_eq!(loader.path_for("happy"), None);
        assert!(matches!(
            loader.load("happy"),
            Err(LoadError::Missing { path: None, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let loader = loader_for(dir.path(), "mp3", 44100);
        assert_eq!(loader.path_for("sad"), Some(dir.path().join("sad.mp3")));
        assert!(matches!(
            loader.load("sad"),
            Err(LoadError::Missing { path: Some(_), .. })
        ));
    }

    #[test]
    fn test_load_and_resample() {
        let dir = tempdir().unwrap();
        write_wav(&dir.path().join("c4.wav"), &[vec![0.25; 2205]], 22050).unwrap();
        let loader = loader_for(dir.path(), "wav", 44100);

        let buffer = loader.load("c4").unwrap();

        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.frame_count(), 4410);
        let samples = buffer.channel(0).unwrap();
        assert!(samples[1000..3400].iter().all(|s| (s - 0.25).abs() < 0.01));
    }

    #[test]
    fn test_decode_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("tense.mp3"), b"garbage").unwrap();
        let loader = loader_for(dir.path(), "mp3", 44100);

        assert!(matches!(
            loader.load("tense"),
            Err(LoadError::Decode { .. })
        ));
    }
}
