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
// Core mixing logic shared by the cpal sink and the mock sink.
use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::ChannelId;
use crate::samples::PcmBuffer;

/// Commands understood by the mixer.
#[derive(Clone, Debug)]
pub enum MixerCommand {
    /// Creates a playback channel for the buffer.
    Register {
        channel: ChannelId,
        buffer: Arc<PcmBuffer>,
    },
    /// Drops queued passes and the current play position.
    Stop(ChannelId),
    /// Queues one pass of the buffer from frame 0.
    Enqueue(ChannelId),
    /// Lets queued passes play.
    Start(ChannelId),
}

/// Playback state of one registered channel.
struct Channel {
    /// The buffer this channel plays.
    buffer: Arc<PcmBuffer>,
    /// Passes waiting to be played after the current one.
    queued: usize,
    /// Play position within the current pass.
    cursor: Option<usize>,
    /// Whether queued passes are allowed to play.
    running: bool,
}

impl Channel {
    fn is_sounding(&self) -> bool {
        self.running && (self.cursor.is_some() || self.queued > 0)
    }

    /// Mixes this channel into an interleaved output block.
    fn mix_into(&mut self, output: &mut [f32], output_channels: usize) {
        if !self.running {
            return;
        }

        let frames = self.buffer.frame_count();
        let source_channels = self.buffer.channel_count() as usize;
        if frames == 0 || source_channels == 0 {
            self.cursor = None;
            self.queued = 0;
            return;
        }

        for out_frame in output.chunks_exact_mut(output_channels) {
            let position = match self.cursor {
                Some(position) => position,
                None if self.queued > 0 => {
                    self.queued -= 1;
                    0
                }
                None => return,
            };

            for (ch, sample) in out_frame.iter_mut().enumerate() {
                // A mono buffer feeds every output channel.
                let source = if source_channels == 1 { 0 } else { ch };
                if let Some(plane) = self.buffer.channel(source) {
                    *sample += plane[position];
                }
            }

            let next = position + 1;
            self.cursor = if next < frames { Some(next) } else { None };
        }
    }
}

/// Sums every sounding channel into the output.
pub struct Mixer {
    channels: HashMap<ChannelId, Channel>,
    /// Number of interleaved output channels.
    output_channels: u16,
}

impl Mixer {
    /// Creates a new mixer.
    pub fn new(output_channels: u16) -> Self {
        Self {
            channels: HashMap::new(),
            output_channels: output_channels.max(1),
        }
    }

    /// Applies a command. Commands for unknown channels are ignored.
    pub fn apply(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Register { channel, buffer } => {
                self.channels.insert(
                    channel,
                    Channel {
                        buffer,
                        queued: 0,
                        cursor: None,
                        running: false,
                    },
                );
            }
            MixerCommand::Stop(channel) => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    state.queued = 0;
                    state.cursor = None;
                    state.running = false;
                }
            }
            MixerCommand::Enqueue(channel) => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    state.queued += 1;
                }
            }
            MixerCommand::Start(channel) => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    state.running = true;
                }
            }
        }
    }

    /// Renders the next block of interleaved audio. The block length must be a
    /// multiple of the output channel count; any remainder is left silent.
    pub fn process_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let output_channels = self.output_channels as usize;
        for channel in self.channels.values_mut() {
            channel.mix_into(output, output_channels);
        }
    }

    /// Gets the number of output channels
    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    /// Returns the frame that will be rendered next on a channel, if it is
    /// in the middle of a pass.
    pub fn position(&self, channel: ChannelId) -> Option<usize> {
        self.channels.get(&channel).and_then(|state| state.cursor)
    }

    /// Returns true if the channel will produce audio on the next block.
    pub fn is_sounding(&self, channel: ChannelId) -> bool {
        self.channels
            .get(&channel)
            .is_some_and(|state| state.is_sounding())
    }

    /// Returns the number of registered channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("channels", &self.channels.len())
            .field("output_channels", &self.output_channels)
            .finish()
    }
}
