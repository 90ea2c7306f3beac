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
use std::path::Path;

use ::config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

pub mod audio;
pub mod error;
pub mod samples;
pub mod sequencer;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::samples::SamplesConfig;
pub use self::sequencer::Sequencer;

/// A YAML representation of the whole engine configuration. Every section
/// is optional, an empty document yields the defaults.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Output device settings.
    #[serde(default)]
    audio: Audio,

    /// Where authored sound assets live.
    #[serde(default)]
    samples: SamplesConfig,

    /// Progression timing.
    #[serde(default)]
    sequencer: Sequencer,
}

impl EngineConfig {
    /// Creates a configuration that uses the given audio device and defaults
    /// for everything else.
    pub fn with_device(device: &str) -> EngineConfig {
        EngineConfig {
            audio: Audio::new(device),
            ..Default::default()
        }
    }

    /// Replaces the configured audio device, keeping the rest.
    pub fn override_device(&mut self, device: &str) {
        self.audio = self.audio.with_device(device);
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn samples(&self) -> &SamplesConfig {
        &self.samples
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }
}

/// Loads the engine configuration from a YAML file. A relative asset
/// directory is taken relative to the file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    info!(path = ?path, "Loading config");
    let mut config: EngineConfig = Config::builder()
        .add_source(File::from(path).format(FileFormat::Yaml))
        .build()?
        .try_deserialize()?;

    if let Some(base) = path.parent() {
        config.samples.resolve_relative_to(base);
    }
    Ok(config)
}

/// Parses the engine configuration from a YAML string.
pub fn parse_config(yaml: &str) -> Result<EngineConfig, ConfigError> {
    Ok(Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .build()?
        .try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.audio().device(), "default");
        assert_eq!(config.audio().sample_rate(), 44100);
        assert_eq!(config.samples().directory(), None);
        assert_eq!(config.samples().extension(), "mp3");
        assert_eq!(
            config.sequencer().interval().unwrap(),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            audio:
              device: mock-device
              sample_rate: 48000
            samples:
              directory: /srv/sounds
              extension: wav
            sequencer:
              interval: 1500ms
            "#,
        )
        .unwrap();

        assert_eq!(config.audio().device(), "mock-device");
        assert_eq!(config.audio().sample_rate(), 48000);
        assert_eq!(
            config.samples().directory(),
            Some(Path::new("/srv/sounds"))
        );
        assert_eq!(config.samples().extension(), "wav");
        assert_eq!(
            config.sequencer().interval().unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_override_device_keeps_rate() {
        let mut config = parse_config("audio:\n  sample_rate: 48000\n").unwrap();
        config.override_device("mock-output");
        assert_eq!(config.audio().device(), "mock-output");
        assert_eq!(config.audio().sample_rate(), 48000);
    }

    #[test]
    fn test_invalid_interval() {
        let config = parse_config("sequencer:\n  interval: soon\n").unwrap();
        assert!(matches!(
            config.sequencer().interval(),
            Err(ConfigError::Duration { .. })
        ));

        let config = parse_config("sequencer:\n  interval: 0s\n").unwrap();
        assert!(config.sequencer().interval().is_err());
    }

    #[test]
    fn test_load_config_resolves_assets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chordpad.yaml");
        std::fs::write(&path, "samples:\n  directory: sounds\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.samples().directory(),
            Some(dir.path().join("sounds").as_path())
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
