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
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::info;

use super::mixer::{Mixer, MixerCommand};
use super::{validate_format, ChannelId, SinkError};
use crate::samples::PcmBuffer;

/// Number of output channels the mock pretends to have.
const MOCK_OUTPUT_CHANNELS: u16 = 2;

/// A command received by the mock sink, as seen from the outside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Register(String),
    Stop(String),
    Enqueue(String),
    Start(String),
}

/// A mock sink. Doesn't play anything, but keeps a mixer so tests can render
/// what a real device would have produced.
pub struct Sink {
    name: String,
    sample_rate: u32,
    mixer: Mutex<Mixer>,
    /// Channel to sound name, for readable command logs.
    names: Mutex<HashMap<ChannelId, String>>,
    commands: Mutex<Vec<Command>>,
    active: AtomicBool,
    fail_activation: AtomicBool,
    /// Sounds whose registration is refused.
    rejected: Mutex<HashSet<String>>,
}

impl Sink {
    /// Creates a new mock sink.
    pub fn new(name: &str, sample_rate: u32) -> Sink {
        Sink {
            name: name.to_string(),
            sample_rate,
            mixer: Mutex::new(Mixer::new(MOCK_OUTPUT_CHANNELS)),
            names: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            active: AtomicBool::new(false),
            fail_activation: AtomicBool::new(false),
            rejected: Mutex::new(HashSet::new()),
        }
    }

    /// Makes the next activation fail, as if the device were unavailable.
    pub fn fail_activation(&self) {
        self.fail_activation.store(true, Ordering::Relaxed);
    }

    /// Makes registration of the named sound fail.
    pub fn reject(&self, name: &str) {
        self.rejected.lock().insert(name.to_string());
    }

    /// Returns true once the sink was activated successfully.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Returns every command received so far.
    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    /// Returns the sound names in the order they were started.
    pub fn started(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                Command::Start(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets the commands received so far.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Renders the given number of frames of interleaved stereo output.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut mixer = self.mixer.lock();
        let mut output = vec![0.0; frames * mixer.output_channels() as usize];
        mixer.process_into(&mut output);
        output
    }

    /// Returns the play position of the named sound, if it is mid-pass.
    pub fn position(&self, name: &str) -> Option<usize> {
        let channel = self.channel_for(name)?;
        self.mixer.lock().position(channel)
    }

    /// Returns true if the named sound would be heard on the next render.
    pub fn is_sounding(&self, name: &str) -> bool {
        self.channel_for(name)
            .is_some_and(|channel| self.mixer.lock().is_sounding(channel))
    }

    fn channel_for(&self, name: &str) -> Option<ChannelId> {
        self.names
            .lock()
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(channel, _)| *channel)
    }

    fn record(&self, channel: ChannelId, command: MixerCommand) {
        let name = self
            .names
            .lock()
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| channel.to_string());
        let recorded = match &command {
            MixerCommand::Register { .. } => Command::Register(name),
            MixerCommand::Stop(_) => Command::Stop(name),
            MixerCommand::Enqueue(_) => Command::Enqueue(name),
            MixerCommand::Start(_) => Command::Start(name),
        };
        self.commands.lock().push(recorded);
        self.mixer.lock().apply(command);
    }
}

impl super::Sink for Sink {
    fn register(&self, name: &str, buffer: Arc<PcmBuffer>) -> Result<ChannelId, SinkError> {
        validate_format(&buffer, self.sample_rate)?;
        if self.rejected.lock().contains(name) {
            return Err(SinkError::Stream(format!("{} refused {}", self.name, name)));
        }

        let channel = ChannelId::next();
        self.names.lock().insert(channel, name.to_string());
        self.record(channel, MixerCommand::Register { channel, buffer });
        Ok(channel)
    }

    fn stop(&self, channel: ChannelId) {
        self.record(channel, MixerCommand::Stop(channel));
    }

    fn enqueue(&self, channel: ChannelId) {
        self.record(channel, MixerCommand::Enqueue(channel));
    }

    fn start(&self, channel: ChannelId) {
        self.record(channel, MixerCommand::Start(channel));
    }

    fn activate(&self) -> Result<(), SinkError> {
        if self.fail_activation.load(Ordering::Relaxed) {
            return Err(SinkError::Device(format!("{} is unavailable", self.name)));
        }
        info!(device = self.name, "Mock sink activated.");
        self.active.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Sink as _;

    fn tone() -> Arc<PcmBuffer> {
        Arc::new(PcmBuffer::from_planar(vec![vec![0.5; 8]; 2], 44100))
    }

    #[test]
    fn test_records_commands() {
        let sink = Sink::new("mock", 44100);
        let channel = sink.register("calm", tone()).unwrap();
        sink.stop(channel);
        sink.enqueue(channel);
        sink.start(channel);

        assert_eq!(
            sink.commands(),
            vec![
                Command::Register("calm".into()),
                Command::Stop("calm".into()),
                Command::Enqueue("calm".into()),
                Command::Start("calm".into()),
            ]
        );
        assert!(sink.is_sounding("calm"));
        assert_eq!(sink.render(4), vec![0.5; 8]);
        assert_eq!(sink.position("calm"), Some(4));
    }

    #[test]
    fn test_rejections() {
        let sink = Sink::new("mock", 48000);
        assert!(matches!(
            sink.register("calm", tone()),
            Err(SinkError::Format(_))
        ));

        let sink = Sink::new("mock", 44100);
        sink.reject("tense");
        assert!(sink.register("tense", tone()).is_err());
        assert!(sink.register("calm", tone()).is_ok());
    }

    #[test]
    fn test_activation() {
        let sink = Sink::new("mock", 44100);
        assert!(sink.activate().is_ok());
        assert!(sink.is_active());

        let sink = Sink::new("mock", 44100);
        sink.fail_activation();
        assert!(matches!(sink.activate(), Err(SinkError::Device(_))));
        assert!(!sink.is_active());
    }
}
