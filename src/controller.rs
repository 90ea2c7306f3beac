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

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};
use tracing::{error, info, span, warn, Level};

use crate::catalog::{self, Chord, Note};
use crate::session::Session;

pub mod keyboard;

/// Controller events that change the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Plays a chord and adds it to the current group.
    Chord(String),

    /// Plays a melody note.
    Note(String),

    /// Starts the progression, or stops it if it is running.
    TogglePlayback,

    /// Stops the progression. Does nothing if it isn't running.
    Stop,

    /// Empties the current group.
    ClearGroup,

    /// Adds a second group.
    AddGroup,

    /// Removes the last group.
    RemoveGroup,

    /// Makes the group at the zero-based index current.
    SelectGroup(usize),

    /// Ends the session.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Applies driver events to a session.
pub struct Controller {
    session: Session,
    chords: Vec<Chord>,
    notes: Vec<Note>,
}

impl Controller {
    pub fn new(session: Session) -> Controller {
        Controller {
            session,
            chords: catalog::chords(),
            notes: catalog::notes(),
        }
    }

    /// Handles events from the driver until it quits or goes away. The
    /// progression is stopped on the way out.
    pub fn run(&mut self, driver: Arc<dyn Driver>) -> Result<(), io::Error> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, events_rx) = unbounded();
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        for event in events_rx.iter() {
            info!(event = format!("{:?}", event), "Received event.");
            if !self.handle(event) {
                break;
            }
        }

        info!("Controller closing.");
        self.session.stop();

        match join_handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Event monitor panicked");
                Err(io::Error::other("event monitor panicked"))
            }
        }
    }

    /// Applies one event. Returns false when the session should end.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Chord(sound) => match self.chords.iter().find(|c| c.sound() == sound) {
                Some(chord) => self.session.select_chord(chord),
                None => warn!(sound = sound.as_str(), "Unknown chord"),
            },
            Event::Note(sound) => match self.notes.iter().find(|n| n.sound() == sound) {
                Some(note) => self.session.play_note(note),
                None => warn!(sound = sound.as_str(), "Unknown note"),
            },
            Event::TogglePlayback => self.session.toggle_playback(),
            Event::Stop => self.session.stop(),
            Event::ClearGroup => self.session.clear_current_group(),
            Event::AddGroup => self.session.add_group(),
            Event::RemoveGroup => self.session.remove_group(),
            Event::SelectGroup(index) => self.session.select_group(index),
            Event::Quit => return false,
        }
        true
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::audio::mock;
    use crate::config::SamplesConfig;
    use crate::samples::{Dispatcher, SampleStore};
    use crate::sequencer::{ManualScheduler, ProgressionSequencer, DEFAULT_INTERVAL};

    /// Replays a fixed list of events.
    struct ScriptedDriver {
        events: Vec<Event>,
    }

    impl Driver for ScriptedDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            thread::spawn(move || {
                for event in events {
                    events_tx.send(event).map_err(io::Error::other)?;
                }
                Ok(())
            })
        }
    }

    fn controller() -> (Controller, Arc<mock::Sink>) {
        let sink = Arc::new(mock::Sink::new("mock", 44100));
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            &SamplesConfig::default(),
            44100,
        ));
        store.preload(&catalog::all_sound_names());
        sink.clear_commands();

        let dispatcher = Arc::new(Dispatcher::new(store, sink.clone()));
        let sequencer = Arc::new(ProgressionSequencer::new(
            dispatcher.clone(),
            Arc::new(ManualScheduler::new()),
            DEFAULT_INTERVAL,
        ));
        (Controller::new(Session::new(dispatcher, sequencer)), sink)
    }

    #[test]
    fn test_scripted_session() {
        let (mut controller, sink) = controller();
        let driver = Arc::new(ScriptedDriver {
            events: vec![
                Event::Chord("happy".into()),
                Event::Note("e4".into()),
                Event::AddGroup,
                Event::SelectGroup(1),
                Event::Chord("tense".into()),
                Event::TogglePlayback,
                Event::Quit,
                // Never reached.
                Event::Chord("sad".into()),
            ],
        });

        controller.run(driver).unwrap();

        assert_eq!(sink.started(), vec!["happy", "e4", "tense", "happy"]);
        assert_eq!(controller.session().groups().len(), 2);
        assert_eq!(controller.session().groups()[1][0].sound(), "tense");
        assert!(!controller.session().is_playing());
    }

    #[test]
    fn test_driver_hangup_ends_run() {
        let (mut controller, sink) = controller();
        let driver = Arc::new(ScriptedDriver {
            events: vec![Event::Chord("calm".into()), Event::TogglePlayback],
        });

        controller.run(driver).unwrap();

        assert_eq!(sink.started(), vec!["calm", "calm"]);
        assert!(!controller.session().is_playing());
    }

    #[test]
    fn test_unknown_sounds_are_ignored() {
        let (mut controller, sink) = controller();

        assert!(controller.handle(Event::Chord("c4".into())));
        assert!(controller.handle(Event::Note("happy".into())));
        assert!(sink.commands().is_empty());
        assert!(controller.session().groups()[0].is_empty());
        assert!(!controller.handle(Event::Quit));
    }
}
