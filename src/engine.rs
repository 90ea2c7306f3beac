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

//! Wires the sink, the sample store, the dispatcher and the sequencer
//! together.

use std::error::Error;
use std::sync::Arc;

use tracing::{error, info, span, Level};

use crate::audio::{self, Sink};
use crate::catalog;
use crate::config::EngineConfig;
use crate::samples::{Dispatch, Dispatcher, SampleStore};
use crate::sequencer::{ProgressionSequencer, Scheduler, ThreadScheduler};

/// A ready-to-play sound engine.
pub struct Engine {
    sink: Arc<dyn Sink>,
    dispatcher: Arc<Dispatcher>,
    sequencer: Arc<ProgressionSequencer>,
}

impl Engine {
    /// Loads every catalog sound and opens the output device. A device that
    /// is missing or fails to open is logged and the engine is returned
    /// anyway; sounds then play silently.
    pub fn preload(config: &EngineConfig) -> Result<Engine, Box<dyn Error>> {
        let sink = audio::get_sink(config.audio());
        Engine::with_sink(config, sink, Arc::new(ThreadScheduler))
    }

    /// Builds an engine around an existing sink and scheduler.
    pub fn with_sink(
        config: &EngineConfig,
        sink: Arc<dyn Sink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Engine, Box<dyn Error>> {
        let span = span!(Level::INFO, "engine");
        let _enter = span.enter();

        let interval = config.sequencer().interval()?;
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            config.samples(),
            config.audio().sample_rate(),
        ));
        store.preload(&catalog::all_sound_names());

        if let Err(e) = sink.activate() {
            error!(sink = %sink, err = %e, "Unable to activate output, playback will be silent");
        } else {
            info!(sink = %sink, "Output activated");
        }

        let dispatcher = Arc::new(Dispatcher::new(store, sink.clone()));
        let sequencer = Arc::new(ProgressionSequencer::new(
            dispatcher.clone(),
            scheduler,
            interval,
        ));

        Ok(Engine {
            sink,
            dispatcher,
            sequencer,
        })
    }

    /// Plays a sound by name.
    pub fn play(&self, name: &str) -> Dispatch {
        self.dispatcher.play(name)
    }

    /// Starts a progression over `primary` followed by `secondary`.
    pub fn start<S: AsRef<str>>(&self, primary: &[S], secondary: &[S]) {
        self.sequencer.start(primary, secondary);
    }

    pub fn stop(&self) {
        self.sequencer.stop();
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn sequencer(&self) -> &Arc<ProgressionSequencer> {
        &self.sequencer
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }
}
