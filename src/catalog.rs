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

//! The fixed set of mood chords and melody notes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sound names of the mood chords, in display order.
pub const CHORD_SOUNDS: [&str; 6] = ["happy", "sad", "excited", "calm", "mysterious", "tense"];

/// Sound names of the melody notes, high range first.
pub const NOTE_SOUNDS: [&str; 15] = [
    "c5", "d5", "e5", "g5", "a5", "c4", "d4", "e4", "g4", "a4", "c3", "d3", "e3", "g3", "a3",
];

const CHORD_DISPLAY: [(&str, &str); 6] = [
    ("Happy", "😊"),
    ("Sad", "😢"),
    ("Excited", "😁"),
    ("Calm", "😌"),
    ("Mysterious", "🧐"),
    ("Tense", "😬"),
];

static NEXT_CHORD_ID: AtomicU64 = AtomicU64::new(1);

/// A mood chord. Every constructed chord is distinct, even if it has the
/// same fields as another one. Clones compare equal to their original.
#[derive(Clone, Debug)]
pub struct Chord {
    id: u64,
    name: String,
    glyph: String,
    sound: String,
}

impl Chord {
    pub fn new(name: &str, glyph: &str, sound: &str) -> Chord {
        Chord {
            id: NEXT_CHORD_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            glyph: glyph.to_string(),
            sound: sound.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    pub fn sound(&self) -> &str {
        &self.sound
    }
}

impl PartialEq for Chord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Chord {}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.glyph, self.name)
    }
}

/// The pitch range a melody note belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteRange {
    High,
    Mid,
    Low,
}

/// A single melody note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    name: String,
    sound: String,
    range: NoteRange,
}

impl Note {
    pub fn new(name: &str, sound: &str, range: NoteRange) -> Note {
        Note {
            name: name.to_string(),
            sound: sound.to_string(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sound(&self) -> &str {
        &self.sound
    }

    pub fn range(&self) -> NoteRange {
        self.range
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builds the six mood chords.
pub fn chords() -> Vec<Chord> {
    CHORD_DISPLAY
        .iter()
        .zip(CHORD_SOUNDS)
        .map(|((name, glyph), sound)| Chord::new(name, glyph, sound))
        .collect()
}

/// Builds the fifteen melody notes.
pub fn notes() -> Vec<Note> {
    NOTE_SOUNDS
        .iter()
        .map(|sound| {
            let range = match sound.chars().last() {
                Some('5') => NoteRange::High,
                Some('4') => NoteRange::Mid,
                _ => NoteRange::Low,
            };
            Note::new(&sound.to_uppercase(), sound, range)
        })
        .collect()
}

/// Builds the chord that plays `sound`, if there is one.
pub fn chord(sound: &str) -> Option<Chord> {
    chords().into_iter().find(|chord| chord.sound() == sound)
}

/// Returns the note that plays `sound`, if there is one.
pub fn note(sound: &str) -> Option<Note> {
    notes().into_iter().find(|note| note.sound() == sound)
}

/// Every sound the app can play, chords first.
pub fn all_sound_names() -> Vec<&'static str> {
    CHORD_SOUNDS.iter().chain(NOTE_SOUNDS.iter()).copied().collect()
}
