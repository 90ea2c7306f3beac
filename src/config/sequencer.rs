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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;

/// Time between two chords of a progression.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// A YAML representation of the progression sequencer configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Sequencer {
    /// Time between chords, e.g. "2s" or "1500ms".
    interval: Option<String>,
}

impl Sequencer {
    /// Returns the chord interval from the configuration.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        let Some(interval) = &self.interval else {
            return Ok(DEFAULT_INTERVAL);
        };

        let parsed: Duration = DurationString::from_string(interval.clone())
            .map_err(|e| ConfigError::Duration {
                value: interval.clone(),
                reason: e.to_string(),
            })?
            .into();

        if parsed.is_zero() {
            return Err(ConfigError::Duration {
                value: interval.clone(),
                reason: "interval must be greater than zero".to_string(),
            });
        }
        Ok(parsed)
    }
}
