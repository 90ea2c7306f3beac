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
use chordpad::audio;
use chordpad::catalog;
use chordpad::config::{self, EngineConfig};
use chordpad::controller::{keyboard, Controller};
use chordpad::engine::Engine;
use chordpad::samples::synth;
use chordpad::session::Session;
use clap::{crate_version, Parser, Subcommand};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Mood chord progressions and melody notes."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads every sound and prints where it came from.
    Sounds {
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Plays sounds one after another.
    Play {
        #[command(flatten)]
        engine: EngineArgs,
        /// The sounds to play, e.g. happy or c4.
        #[arg(required = true)]
        sounds: Vec<String>,
    },
    /// Cycles through a chord progression.
    Progression {
        #[command(flatten)]
        engine: EngineArgs,
        /// The chords of the first group.
        #[arg(required = true)]
        chords: Vec<String>,
        /// The chords of an optional second group, played after the first.
        #[arg(long, num_args = 1..)]
        then: Vec<String>,
        /// How many times to go through the whole progression.
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },
    /// Writes the synthesized tone for a sound to a WAV file.
    Render {
        /// The sound to render.
        sound: String,
        /// Where to write the WAV file.
        output: PathBuf,
    },
    /// Builds and plays progressions interactively from the keyboard.
    Session {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// The path to the YAML configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The audio device to use. Overrides the configuration.
    #[arg(short, long)]
    device: Option<String>,
}

impl EngineArgs {
    fn load(&self) -> Result<Engine, Box<dyn Error>> {
        let mut engine_config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => EngineConfig::default(),
        };
        if let Some(device) = &self.device {
            engine_config.override_device(device);
        }
        Engine::preload(&engine_config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Sounds { engine } => {
            let engine = engine.load()?;
            let store = engine.dispatcher().store();

            println!("Sounds (count: {}):", store.len());
            for name in catalog::all_sound_names() {
                match (store.status(name), store.get(name)) {
                    (Some(status), Some(asset)) => println!(
                        "- {}: {}, {:.1}s, {} channel(s)",
                        name,
                        status,
                        asset.buffer().duration().as_secs_f32(),
                        asset.buffer().channel_count()
                    ),
                    (Some(status), None) => println!("- {}: {}", name, status),
                    (None, _) => println!("- {}: not loaded", name),
                }
            }
        }
        Commands::Play { engine, sounds } => {
            let engine = engine.load()?;

            for sound in sounds.iter() {
                engine.play(sound);
                if let Some(asset) = engine.dispatcher().store().get(sound) {
                    thread::sleep(asset.buffer().duration());
                }
            }
        }
        Commands::Progression {
            engine,
            chords,
            then,
            cycles,
        } => {
            let engine = engine.load()?;
            let run_time = engine
                .sequencer()
                .run_time(chords.len() + then.len(), cycles)
                .ok_or("--cycles is too large")?;

            engine.start(chords.as_slice(), then.as_slice());
            thread::sleep(run_time);
            engine.stop();
        }
        Commands::Render { sound, output } => {
            let buffer = synth::synthesize(&sound);
            let mut writer = WavWriter::create(
                &output,
                WavSpec {
                    channels: buffer.channel_count(),
                    sample_rate: buffer.sample_rate(),
                    bits_per_sample: 32,
                    sample_format: SampleFormat::Float,
                },
            )?;

            for frame in 0..buffer.frame_count() {
                for channel in 0..buffer.channel_count() as usize {
                    let sample = buffer.channel(channel).map_or(0.0, |c| c[frame]);
                    writer.write_sample(sample)?;
                }
            }
            writer.finalize()?;

            println!(
                "Wrote {} ({:.1}s) to {}",
                sound,
                buffer.duration().as_secs_f32(),
                output.display()
            );
        }
        Commands::Session { engine } => {
            let engine = engine.load()?;
            let session = Session::new(engine.dispatcher().clone(), engine.sequencer().clone());

            Controller::new(session).run(Arc::new(keyboard::Driver::new()))?;
        }
    }

    Ok(())
}
