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

//! The in-memory table of playable sounds.
//!
//! Every sound is loaded once, registered with the output sink and kept for
//! the life of the process. The table is written during preload and only
//! read afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, span, warn, Level};

use super::buffer::PcmBuffer;
use super::loader::{AssetLoader, LoadError};
use super::synth;
use crate::audio::{ChannelId, Sink};
use crate::config::SamplesConfig;

/// Where a sound's buffer came from, or why it cannot be played.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    /// Decoded from an authored asset file.
    Decoded,
    /// Generated as a fallback tone.
    Synthesized,
    /// The sink refused the buffer. Playing the sound is a no-op.
    Unplayable,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetStatus::Decoded => "decoded",
            AssetStatus::Synthesized => "synthesized",
            AssetStatus::Unplayable => "unplayable",
        };
        f.write_str(label)
    }
}

/// A loaded sound and the playback channel it owns.
#[derive(Clone, Debug)]
pub struct SoundAsset {
    buffer: Arc<PcmBuffer>,
    channel: ChannelId,
}

impl SoundAsset {
    pub fn buffer(&self) -> &PcmBuffer {
        &self.buffer
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }
}

/// Maps sound names to buffers and their playback channels.
pub struct SampleStore {
    sink: Arc<dyn Sink>,
    loader: AssetLoader,
    /// Output rate every registered buffer is converted to.
    sample_rate: u32,
    assets: RwLock<HashMap<String, SoundAsset>>,
    statuses: RwLock<HashMap<String, AssetStatus>>,
}

impl SampleStore {
    /// Creates an empty store that registers buffers with the given sink.
    pub fn new(sink: Arc<dyn Sink>, config: &SamplesConfig, sample_rate: u32) -> SampleStore {
        SampleStore {
            sink,
            loader: AssetLoader::new(config, sample_rate),
            sample_rate,
            assets: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// Loads every named sound in order.
    pub fn preload<S: AsRef<str>>(&self, names: &[S]) {
        let span = span!(Level::INFO, "preload", sounds = names.len());
        let _enter = span.enter();

        for name in names {
            self.load(name.as_ref());
        }

        info!(
            loaded = self.assets.read().len(),
            unplayable = self
                .statuses
                .read()
                .values()
                .filter(|status| **status == AssetStatus::Unplayable)
                .count(),
            "Preload finished"
        );
    }

    /// Loads the authored asset for `name`, falling back to a synthesized
    /// tone when there is none or it can't be decoded. Sounds are only ever
    /// loaded once; later calls report the existing status.
    pub fn load(&self, name: &str) -> AssetStatus {
        if let Some(status) = self.status(name) {
            debug!(sound = name, %status, "Sound already loaded");
            return status;
        }

        match self.loader.load(name) {
            Ok(buffer) => self.register(name, buffer, AssetStatus::Decoded),
            Err(e @ LoadError::Missing { .. }) => {
                warn!(sound = name, err = %e, "Asset missing, synthesizing a fallback tone");
                self.synthesize(name)
            }
            Err(e) => {
                warn!(sound = name, err = %e, "Asset could not be decoded, synthesizing a fallback tone");
                self.synthesize(name)
            }
        }
    }

    /// Generates the fallback tone for `name` and registers it the same way
    /// a decoded asset would be.
    pub fn synthesize(&self, name: &str) -> AssetStatus {
        if let Some(status) = self.status(name) {
            return status;
        }

        let tone = synth::synthesize(name);
        if tone.sample_rate() == self.sample_rate {
            return self.register(name, tone, AssetStatus::Synthesized);
        }
        match tone.resample(self.sample_rate) {
            Ok(buffer) => self.register(name, buffer, AssetStatus::Synthesized),
            Err(e) => {
                error!(sound = name, err = %e, "Could not convert the fallback tone");
                self.statuses
                    .write()
                    .insert(name.to_string(), AssetStatus::Unplayable);
                AssetStatus::Unplayable
            }
        }
    }

    /// Returns the loaded sound with the given name, if it is playable.
    pub fn get(&self, name: &str) -> Option<SoundAsset> {
        self.assets.read().get(name).cloned()
    }

    /// Returns the status of a sound, or None if it was never loaded.
    pub fn status(&self, name: &str) -> Option<AssetStatus> {
        self.statuses.read().get(name).copied()
    }

    /// Returns the number of playable sounds.
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    fn register(&self, name: &str, buffer: PcmBuffer, origin: AssetStatus) -> AssetStatus {
        let buffer = Arc::new(buffer);
        let status = match self.sink.register(name, buffer.clone()) {
            Ok(channel) => {
                info!(
                    sound = name,
                    %channel,
                    origin = %origin,
                    duration_ms = buffer.duration().as_millis(),
                    "Sound registered"
                );
                self.assets
                    .write()
                    .insert(name.to_string(), SoundAsset { buffer, channel });
                origin
            }
            Err(e) => {
                error!(sound = name, sink = %self.sink, err = %e, "Could not set up a playback channel");
                AssetStatus::Unplayable
            }
        };
        self.statuses.write().insert(name.to_string(), status);
        status
    }
}

impl fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleStore")
            .field("sink", &self.sink.to_string())
            .field("loader", &self.loader)
            .field("sounds", &self.statuses.read().len())
            .finish()
    }
}
