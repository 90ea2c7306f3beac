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

//! The chord grouping and playback state a user works with.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{Chord, Note};
use crate::samples::Dispatcher;
use crate::sequencer::ProgressionSequencer;

/// Most chords a single group can hold.
pub const MAX_CHORDS_PER_GROUP: usize = 4;

/// Most groups a session can hold.
pub const MAX_GROUPS: usize = 2;

/// Chord groups being built up and the engine they play through.
pub struct Session {
    dispatcher: Arc<Dispatcher>,
    sequencer: Arc<ProgressionSequencer>,
    groups: Vec<Vec<Chord>>,
    current: usize,
}

impl Session {
    /// Creates a session with a single empty group.
    pub fn new(dispatcher: Arc<Dispatcher>, sequencer: Arc<ProgressionSequencer>) -> Session {
        Session {
            dispatcher,
            sequencer,
            groups: vec![Vec::new()],
            current: 0,
        }
    }

    /// Plays the chord and adds it to the current group if there is room.
    pub fn select_chord(&mut self, chord: &Chord) {
        self.dispatcher.play(chord.sound());

        let group = &mut self.groups[self.current];
        if group.len() < MAX_CHORDS_PER_GROUP {
            group.push(chord.clone());
            debug!(chord = chord.name(), group = self.current, "Chord added");
        } else {
            debug!(chord = chord.name(), group = self.current, "Group full");
        }
    }

    pub fn play_note(&self, note: &Note) {
        self.dispatcher.play(note.sound());
    }

    /// Stops a running progression, or starts one from the groups. Nothing
    /// starts while the first group is empty.
    pub fn toggle_playback(&self) {
        if self.sequencer.is_playing() {
            self.sequencer.stop();
            return;
        }

        let Some(first) = self.groups.first().filter(|group| !group.is_empty()) else {
            info!("First group is empty, nothing to play");
            return;
        };
        let second = self.groups.get(1).map(Vec::as_slice).unwrap_or_default();

        let primary: Vec<&str> = first.iter().map(Chord::sound).collect();
        let secondary: Vec<&str> = second.iter().map(Chord::sound).collect();
        self.sequencer.start(&primary, &secondary);
    }

    /// Stops the progression if it is running.
    pub fn stop(&self) {
        self.sequencer.stop();
    }

    pub fn clear_current_group(&mut self) {
        self.groups[self.current].clear();
    }

    /// Adds an empty group, up to the maximum.
    pub fn add_group(&mut self) {
        if self.groups.len() < MAX_GROUPS {
            self.groups.push(Vec::new());
        }
    }

    /// Removes the last group, keeping at least one.
    pub fn remove_group(&mut self) {
        if self.groups.len() > 1 {
            self.groups.pop();
            self.current = self.current.min(self.groups.len() - 1);
        }
    }

    /// Makes `index` the group that selected chords go into. Out of range
    /// indexes are ignored.
    pub fn select_group(&mut self, index: usize) {
        if index < self.groups.len() {
            self.current = index;
        }
    }

    pub fn groups(&self) -> &[Vec<Chord>] {
        &self.groups
    }

    pub fn current_group(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock;
    use crate::catalog;
    use crate::config::SamplesConfig;
    use crate::samples::SampleStore;
    use crate::sequencer::{ManualScheduler, DEFAULT_INTERVAL};

    struct Fixture {
        session: Session,
        scheduler: Arc<ManualScheduler>,
        sink: Arc<mock::Sink>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(mock::Sink::new("mock", 44100));
        let store = Arc::new(SampleStore::new(
            sink.clone(),
            &SamplesConfig::default(),
            44100,
        ));
        store.preload(&catalog::all_sound_names());
        sink.clear_commands();

        let dispatcher = Arc::new(Dispatcher::new(store, sink.clone()));
        let scheduler = Arc::new(ManualScheduler::new());
        let sequencer = Arc::new(ProgressionSequencer::new(
            dispatcher.clone(),
            scheduler.clone(),
            DEFAULT_INTERVAL,
        ));
        Fixture {
            session: Session::new(dispatcher, sequencer),
            scheduler,
            sink,
        }
    }

    #[test]
    fn test_select_chord_plays_and_appends() {
        let mut f = fixture();
        let chords = catalog::chords();

        f.session.select_chord(&chords[0]);

        assert_eq!(f.sink.started(), vec!["happy"]);
        assert_eq!(f.session.groups()[0], vec![chords[0].clone()]);
    }

    #[test]
    fn test_group_holds_four_chords() {
        let mut f = fixture();
        let chords = catalog::chords();

        for chord in &chords {
            f.session.select_chord(chord);
        }

        // All six played, only four kept.
        assert_eq!(f.sink.started().len(), 6);
        assert_eq!(f.session.groups()[0], chords[..4].to_vec());
    }

    #[test]
    fn test_group_limits() {
        let mut f = fixture();

        f.session.remove_group();
        assert_eq!(f.session.groups().len(), 1);

        f.session.add_group();
        f.session.add_group();
        assert_eq!(f.session.groups().len(), 2);

        f.session.select_group(1);
        assert_eq!(f.session.current_group(), 1);
        f.session.select_group(5);
        assert_eq!(f.session.current_group(), 1);

        f.session.remove_group();
        assert_eq!(f.session.groups().len(), 1);
        assert_eq!(f.session.current_group(), 0);
    }

    #[test]
    fn test_toggle_with_empty_first_group() {
        let mut f = fixture();
        f.session.add_group();
        f.session.select_group(1);
        f.session.select_chord(&catalog::chords()[2]);
        f.sink.clear_commands();

        f.session.toggle_playback();

        assert!(!f.session.is_playing());
        assert!(f.sink.commands().is_empty());
    }

    #[test]
    fn test_toggle_plays_both_groups() {
        let mut f = fixture();
        let chords = catalog::chords();
        f.session.select_chord(&chords[0]);
        f.session.select_chord(&chords[1]);
        f.session.add_group();
        f.session.select_group(1);
        f.session.select_chord(&chords[3]);
        f.sink.clear_commands();

        f.session.toggle_playback();
        assert!(f.session.is_playing());
        f.scheduler.advance(3);
        assert_eq!(f.sink.started(), vec!["happy", "sad", "calm", "happy"]);

        f.session.toggle_playback();
        assert!(!f.session.is_playing());
        f.scheduler.advance(1);
        assert_eq!(f.sink.started().len(), 4);
    }

    #[test]
    fn test_clear_and_notes() {
        let mut f = fixture();
        f.session.select_chord(&catalog::chords()[5]);
        f.session.clear_current_group();
        assert!(f.session.groups()[0].is_empty());

        f.session.play_note(&catalog::notes()[9]);
        assert_eq!(f.sink.started(), vec!["tense", "a4"]);
    }
}
