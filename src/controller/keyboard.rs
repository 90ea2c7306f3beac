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
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use tracing::{info, span, warn, Level};

use super::Event;
use crate::catalog::{CHORD_SOUNDS, NOTE_SOUNDS};

const CHORD: &str = "chord";
const NOTE: &str = "note";
const PLAY: &str = "play";
const STOP: &str = "stop";
const CLEAR: &str = "clear";
const ADD: &str = "add";
const REMOVE: &str = "remove";
const GROUP: &str = "group";
const QUIT: &str = "quit";

/// A controller that drives a session from lines typed on the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Prompts for and handles a single line. Returns false once there is
    /// nothing more to read.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <sound>, {} <sound>, {}, {}, {}, {}, {}, {} <n>, {}): ",
            CHORD, NOTE, PLAY, STOP, CLEAR, ADD, REMOVE, GROUP, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            send(events_tx, Event::Quit)?;
            return Ok(false);
        }

        match parse_command(&input) {
            Some(event) => {
                let more = event != Event::Quit;
                send(events_tx, event)?;
                Ok(more)
            }
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                Ok(true)
            }
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

fn send(events_tx: &Sender<Event>, event: Event) -> Result<(), io::Error> {
    events_tx.send(event).map_err(io::Error::other)
}

/// Turns a line of input into an event. Returns None for anything that isn't
/// a known command or names a sound that doesn't exist.
pub fn parse_command(input: &str) -> Option<Event> {
    let input = input.trim().to_lowercase();
    let mut words = input.split_whitespace();
    let command = words.next()?;
    let argument = words.next();
    if words.next().is_some() {
        return None;
    }

    match (command, argument) {
        (CHORD, Some(sound)) if CHORD_SOUNDS.iter().any(|s| *s == sound) => {
            Some(Event::Chord(sound.to_string()))
        }
        (NOTE, Some(sound)) if NOTE_SOUNDS.iter().any(|s| *s == sound) => Some(Event::Note(sound.to_string())),
        (PLAY, None) => Some(Event::TogglePlayback),
        (STOP, None) => Some(Event::Stop),
        (CLEAR, None) => Some(Event::ClearGroup),
        (ADD, None) => Some(Event::AddGroup),
        (REMOVE, None) => Some(Event::RemoveGroup),
        (GROUP, Some(number)) => match number.parse::<usize>() {
            Ok(number) if number >= 1 => Some(Event::SelectGroup(number - 1)),
            _ => None,
        },
        (QUIT, None) => Some(Event::Quit),
        _ => None,
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
