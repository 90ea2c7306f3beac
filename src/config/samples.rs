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
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Extension appended to sound names when looking for authored assets.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// A YAML representation of where authored sound assets live.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SamplesConfig {
    /// Directory holding `<name>.<extension>` files. When unset, every sound
    /// falls back to a synthesized tone.
    directory: Option<PathBuf>,

    /// File extension of the assets (default: "mp3").
    extension: Option<String>,
}

impl SamplesConfig {
    /// Returns the asset directory, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Returns the asset file extension without the leading dot.
    pub fn extension(&self) -> &str {
        self.extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Resolves a relative asset directory against the directory of the
    /// config file it was read from.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if let Some(directory) = &self.directory {
            if directory.is_relative() {
                self.directory = Some(base.join(directory));
            }
        }
    }
}

#[cfg(test)]
impl SamplesConfig {
    /// Creates a new samples config (test only).
    pub fn new(directory: Option<&Path>, extension: &str) -> Self {
        Self {
            directory: directory.map(Path::to_path_buf),
            extension: Some(extension.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SamplesConfig::default();
        assert_eq!(config.directory(), None);
        assert_eq!(config.extension(), "mp3");
    }

    #[test]
    fn test_extension_strips_dot() {
        let config = SamplesConfig::new(None, ".wav");
        assert_eq!(config.extension(), "wav");
    }

    #[test]
    fn test_resolve_relative() {
        let mut config = SamplesConfig::new(Some(Path::new("sounds")), "mp3");
        config.resolve_relative_to(Path::new("/etc/chordpad"));
        assert_eq!(config.directory(), Some(Path::new("/etc/chordpad/sounds")));

        let mut config = SamplesConfig::new(Some(Path::new("/srv/sounds")), "mp3");
        config.resolve_relative_to(Path::new("/etc/chordpad"));
        assert_eq!(config.directory(), Some(Path::new("/srv/sounds")));
    }
}
