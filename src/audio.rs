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

//! The output sink the sample engine plays through.
//!
//! Buffers are handed to the sink once, when a sound is loaded, and each gets
//! its own playback channel. After that only stop/enqueue/start commands
//! addressed by channel cross the boundary.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config;
use crate::samples::PcmBuffer;

pub mod cpal;
pub mod mixer;
pub mod mock;

/// Global counter for channel IDs.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a playback channel registered with a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocates a new, process-unique channel ID.
    pub fn next() -> ChannelId {
        ChannelId(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by an output sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Unsupported buffer format: {0}")]
    Format(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Output stream error: {0}")]
    Stream(String),
}

/// A mixing output that plays registered buffers on named channels.
pub trait Sink: fmt::Display + Send + Sync {
    /// Registers a buffer and creates the playback channel for it.
    fn register(&self, name: &str, buffer: Arc<PcmBuffer>) -> Result<ChannelId, SinkError>;

    /// Stops whatever is playing or queued on the channel.
    fn stop(&self, channel: ChannelId);

    /// Queues one full pass of the channel's buffer, from its first frame.
    fn enqueue(&self, channel: ChannelId);

    /// Starts playing what is queued on the channel.
    fn start(&self, channel: ChannelId);

    /// Opens the device and starts mixing.
    fn activate(&self) -> Result<(), SinkError>;
}

/// Checks that a buffer can be played by a sink running at `sample_rate`.
pub fn validate_format(buffer: &PcmBuffer, sample_rate: u32) -> Result<(), SinkError> {
    if buffer.sample_rate() != sample_rate {
        return Err(SinkError::Format(format!(
            "sample rate {}Hz does not match output rate {}Hz",
            buffer.sample_rate(),
            sample_rate
        )));
    }
    if !(1..=2).contains(&buffer.channel_count()) {
        return Err(SinkError::Format(format!(
            "{} channels, only mono and stereo are supported",
            buffer.channel_count()
        )));
    }
    if buffer.is_empty() {
        return Err(SinkError::Format("buffer has no frames".to_string()));
    }
    Ok(())
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, Box<dyn Error>> {
    cpal::Sink::list()
}

/// Gets the sink for the given configuration. Device names starting with
/// "mock" get a mock sink that never touches real hardware.
///
/// No device is opened here. A missing or broken device is reported by
/// `Sink::activate`.
pub fn get_sink(config: &config::Audio) -> Arc<dyn Sink> {
    let device = config.device();
    if device.starts_with("mock") {
        return Arc::new(mock::Sink::new(device, config.sample_rate()));
    }

    Arc::new(cpal::Sink::get(config))
}
