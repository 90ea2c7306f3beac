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
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, span, Level};

use super::mixer::{Mixer, MixerCommand};
use super::{validate_format, ChannelId, SinkError};
use crate::config;
use crate::samples::PcmBuffer;

/// An output device as reported by cpal.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// The name of the device.
    pub name: String,
    /// The maximum number of output channels the device supports.
    pub max_channels: u16,
    /// The name of the host the device belongs to.
    pub host: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Keeps the thread that owns the cpal stream alive.
struct OutputThread {
    /// Dropping or sending on this ends the thread and closes the stream.
    shutdown_tx: Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl Drop for OutputThread {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// A sink backed by a cpal output device. Commands are queued on a channel
/// and applied by the audio callback before it mixes the next block.
///
/// The device is only looked up on activation. Until then commands are held
/// in the queue. If activation fails the queue is emptied and later commands
/// are dropped.
pub struct Sink {
    /// The name of the device.
    name: String,
    /// Output sample rate.
    sample_rate: u32,
    /// Commands for the mixer living in the audio callback.
    command_tx: Sender<MixerCommand>,
    command_rx: Receiver<MixerCommand>,
    /// Set once the stream is running.
    output: Mutex<Option<OutputThread>>,
    /// Set once activation has failed. Nothing will drain the queue after that.
    failed: AtomicBool,
}

impl Sink {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
        Ok(Self::list_cpal_devices()?
            .into_iter()
            .map(|(info, _)| info)
            .collect())
    }

    fn list_cpal_devices() -> Result<Vec<(DeviceInfo, cpal::Device)>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push((
                        DeviceInfo {
                            name: device.name()?,
                            max_channels,
                            host: host_id.name().to_string(),
                        },
                        device,
                    ));
                }
            }
        }

        devices.sort_by_key(|(info, _)| info.name.to_string());
        Ok(devices)
    }

    /// Creates a sink for the device named in the configuration. The device
    /// itself is resolved by `activate`.
    pub fn get(config: &config::Audio) -> Sink {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        Sink {
            name: config.device().to_string(),
            sample_rate: config.sample_rate(),
            command_tx,
            command_rx,
            output: Mutex::new(None),
            failed: AtomicBool::new(false),
        }
    }

    /// Finds a cpal device by name. "default" picks the default output device
    /// of the default host.
    fn find_device(name: &str) -> Result<cpal::Device, SinkError> {
        if name == config::audio::DEFAULT_DEVICE {
            return cpal::default_host()
                .default_output_device()
                .ok_or_else(|| SinkError::Device("no default output device".to_string()));
        }

        Self::list_cpal_devices()
            .map_err(|e| SinkError::Device(e.to_string()))?
            .into_iter()
            .find(|(info, _)| info.name.trim() == name)
            .map(|(_, device)| device)
            .ok_or_else(|| SinkError::Device(format!("no device found with name {}", name)))
    }

    fn send(&self, command: MixerCommand) {
        if self.failed.load(Ordering::Acquire) {
            return;
        }
        // The receiver lives as long as self, so this can't fail.
        let _ = self.command_tx.send(command);
    }

    /// Marks the sink as failed and throws away everything queued so far.
    fn fail(&self, err: SinkError) -> SinkError {
        self.failed.store(true, Ordering::Release);
        let dropped = self.command_rx.try_iter().count();
        debug!(device = self.name, dropped, "Discarded queued commands");
        err
    }

    /// Number of commands waiting for the audio callback.
    #[cfg(test)]
    fn queued(&self) -> usize {
        self.command_rx.len()
    }
}

/// Builds an output stream whose callback owns the mixer.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    commands: Receiver<MixerCommand>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut mixer = Mixer::new(config.channels);
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(command) = commands.try_recv() {
                mixer.apply(command);
            }

            scratch.resize(data.len(), 0.0);
            mixer.process_into(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )
}

/// Opens the stream and keeps it playing until shutdown is signalled.
/// The outcome of opening is reported on `ready_tx`.
fn run_output(
    device: cpal::Device,
    sample_rate: u32,
    commands: Receiver<MixerCommand>,
    ready_tx: Sender<Result<(), SinkError>>,
    shutdown_rx: Receiver<()>,
) {
    let span = span!(Level::INFO, "audio output");
    let _enter = span.enter();

    let stream = (|| {
        let supported = device
            .default_output_config()
            .map_err(|e| SinkError::Device(e.to_string()))?;
        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, commands),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, commands),
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, commands),
            format => {
                return Err(SinkError::Stream(format!(
                    "unsupported sample format {}",
                    format
                )))
            }
        }
        .map_err(|e| SinkError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SinkError::Stream(e.to_string()))?;
        debug!(
            channels = config.channels,
            sample_rate, "CPAL output stream started"
        );
        Ok(stream)
    })();

    match stream {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            // Keep the stream alive until the sink goes away.
            let _ = shutdown_rx.recv();
            drop(stream);
            info!("CPAL output stream closed");
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

impl super::Sink for Sink {
    fn register(&self, name: &str, buffer: Arc<PcmBuffer>) -> Result<ChannelId, SinkError> {
        validate_format(&buffer, self.sample_rate)?;

        let channel = ChannelId::next();
        debug!(sound = name, %channel, "Registering channel");
        self.send(MixerCommand::Register { channel, buffer });
        Ok(channel)
    }

    fn stop(&self, channel: ChannelId) {
        self.send(MixerCommand::Stop(channel));
    }

    fn enqueue(&self, channel: ChannelId) {
        self.send(MixerCommand::Enqueue(channel));
    }

    fn start(&self, channel: ChannelId) {
        self.send(MixerCommand::Start(channel));
    }

    fn activate(&self) -> Result<(), SinkError> {
        let mut output = self.output.lock();
        if output.is_some() {
            return Ok(());
        }
        if self.failed.load(Ordering::Acquire) {
            return Err(SinkError::Device(format!(
                "{} failed to activate earlier",
                self.name
            )));
        }

        let device = Self::find_device(&self.name).map_err(|e| self.fail(e))?;

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let commands = self.command_rx.clone();
        let sample_rate = self.sample_rate;
        let join = thread::spawn(move || {
            run_output(device, sample_rate, commands, ready_tx, shutdown_rx)
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(device = self.name, "Output sink activated.");
                *output = Some(OutputThread {
                    shutdown_tx,
                    join: Some(join),
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(self.fail(e))
            }
            Err(_) => {
                let _ = join.join();
                Err(self.fail(SinkError::Stream("output thread exited".to_string())))
            }
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}Hz)", self.name, self.sample_rate)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serial_test::serial;

    use super::Sink;
    use crate::audio::{ChannelId, Sink as _, SinkError};
    use crate::config;
    use crate::samples::PcmBuffer;

    #[test]
    fn test_get_does_not_open_the_device() {
        let sink = Sink::get(&config::Audio::new("no-such-output-device"));
        assert_eq!(sink.to_string(), "no-such-output-device (44100Hz)");
        assert_eq!(sink.queued(), 0);
    }

    #[test]
    fn test_commands_queue_until_activation() {
        let sink = Sink::get(&config::Audio::new("no-such-output-device"));
        let buffer = Arc::new(PcmBuffer::from_planar(vec![vec![0.0; 16]], 44100));

        let channel = sink.register("happy", buffer).unwrap();
        sink.stop(channel);
        sink.enqueue(channel);
        sink.start(channel);

        assert_eq!(sink.queued(), 4);
    }

    #[test]
    #[serial]
    fn test_failed_activation_stops_queueing() {
        let sink = Sink::get(&config::Audio::new("no-such-output-device"));
        let buffer = Arc::new(PcmBuffer::from_planar(vec![vec![0.0; 16]], 44100));
        let channel = sink.register("happy", buffer).unwrap();
        assert_eq!(sink.queued(), 1);

        assert!(matches!(sink.activate(), Err(SinkError::Device(_))));
        assert_eq!(sink.queued(), 0);

        for _ in 0..100 {
            sink.stop(channel);
            sink.enqueue(channel);
            sink.start(channel);
        }
        sink.stop(ChannelId::next());
        assert_eq!(sink.queued(), 0);

        // A second attempt fails without looking for the device again.
        assert!(matches!(sink.activate(), Err(SinkError::Device(_))));
    }
}
