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

//! Name-based playback with retrigger semantics.

use std::sync::Arc;

use tracing::{debug, warn};

use super::store::SampleStore;
use crate::audio::Sink;

/// Outcome of a play request. Callers are free to ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The sound was restarted from its first frame.
    Started,
    /// No playable sound by that name. Nothing happened.
    NotLoaded,
}

/// Plays loaded sounds by name.
pub struct Dispatcher {
    store: Arc<SampleStore>,
    sink: Arc<dyn Sink>,
}

impl Dispatcher {
    pub fn new(store: Arc<SampleStore>, sink: Arc<dyn Sink>) -> Dispatcher {
        Dispatcher { store, sink }
    }

    /// Plays the named sound from the start. If it is already playing, the
    /// current playback is cut off first. Other sounds keep playing.
    pub fn play(&self, name: &str) -> Dispatch {
        let Some(asset) = self.store.get(name) else {
            warn!(sound = name, "Sound not loaded");
            return Dispatch::NotLoaded;
        };

        let channel = asset.channel();
        self.sink.stop(channel);
        self.sink.enqueue(channel);
        self.sink.start(channel);
        debug!(sound = name, %channel, "Playing sound");
        Dispatch::Started
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{self, Command};
    use crate::config::SamplesConfig;
    use crate::samples::AssetStatus;

    fn dispatcher(names: &[&str]) -> (Dispatcher, Arc<mock::Sink>) {
        let sink = Arc::new(mock::Sink::new("mock", 44100));
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            &SamplesConfig::default(),
            44100,
        ));
        store.preload(names);
        sink.clear_commands();
        (Dispatcher::new(store, sink.clone()), sink)
    }

    #[test]
    fn test_play_issues_stop_enqueue_start() {
        let (dispatcher, sink) = dispatcher(&["happy"]);

        assert_eq!(dispatcher.play("happy"), Dispatch::Started);
        assert_eq!(
            sink.commands(),
            vec![
                Command::Stop("happy".into()),
                Command::Enqueue("happy".into()),
                Command::Start("happy".into()),
            ]
        );
        assert!(sink.is_sounding("happy"));
    }

    #[test]
    fn test_retrigger_restarts_from_first_frame() {
        let (dispatcher, sink) = dispatcher(&["c4"]);

        dispatcher.play("c4");
        sink.render(1000);
        assert_eq!(sink.position("c4"), Some(1000));

        dispatcher.play("c4");
        sink.render(10);
        assert_eq!(sink.position("c4"), Some(10));

        // Only one pass is queued after the retrigger.
        sink.render(44100);
        assert!(!sink.is_sounding("c4"));
    }

    #[test]
    fn test_retrigger_leaves_other_sounds_alone() {
        let (dispatcher, sink) = dispatcher(&["c4", "e4"]);

        dispatcher.play("c4");
        dispatcher.play("e4");
        sink.render(500);
        dispatcher.play("c4");
        sink.render(10);

        assert_eq!(sink.position("c4"), Some(10));
        assert_eq!(sink.position("e4"), Some(510));
    }

    #[test]
    fn test_missing_sound_is_a_no_op() {
        let (dispatcher, sink) = dispatcher(&["happy"]);

        assert_eq!(dispatcher.play("nonexistent"), Dispatch::NotLoaded);
        assert!(sink.commands().is_empty());
    }

    #[test]
    fn test_unplayable_sound_is_a_no_op() {
        let sink = Arc::new(mock::Sink::new("mock", 44100));
        sink.reject("sad");
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            &SamplesConfig::default(),
            44100,
        ));
        store.preload(&["happy", "sad"]);
        let dispatcher = Dispatcher::new(store, sink.clone());
        sink.clear_commands();

        assert_eq!(dispatcher.store().status("sad"), Some(AssetStatus::Unplayable));
        assert_eq!(dispatcher.play("sad"), Dispatch::NotLoaded);
        assert_eq!(dispatcher.play("happy"), Dispatch::Started);
        assert_eq!(sink.started(), vec!["happy".to_string()]);
    }

    #[test]
    fn test_decoded_and_synthesized_play_alike() {
        let dir = tempfile::tempdir().unwrap();
        crate::testutil::write_wav(&dir.path().join("sad.wav"), &[vec![0.2; 4410], vec![0.2; 4410]], 44100)
            .unwrap();
        let sink = Arc::new(mock::Sink::new("mock", 44100));
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            &SamplesConfig::new(Some(dir.path()), "wav"),
            44100,
        ));
        store.preload(&["sad", "calm"]);
        let dispatcher = Dispatcher::new(store, sink.clone());
        sink.clear_commands();

        assert_eq!(dispatcher.play("sad"), Dispatch::Started);
        assert_eq!(dispatcher.play("calm"), Dispatch::Started);
        assert_eq!(sink.started(), vec!["sad".to_string(), "calm".to_string()]);
        assert_eq!(dispatcher.store().status("sad"), Some(AssetStatus::Decoded));
        assert_eq!(dispatcher.store().status("calm"), Some(AssetStatus::Synthesized));
    }
}
