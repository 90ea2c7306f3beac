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

//! Timed chord progressions.
//!
//! A progression plays its first chord right away and then advances one
//! chord per interval, wrapping around until it is stopped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, span, Level};

use crate::samples::Dispatcher;

mod timer;

pub use timer::{Scheduler, ThreadScheduler, Tick, TimerHandle};

#[cfg(test)]
pub use timer::ManualScheduler;

pub use crate::config::sequencer::DEFAULT_INTERVAL;

/// Plays sequences of sounds on a repeating timer.
pub struct ProgressionSequencer {
    dispatcher: Arc<Dispatcher>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    /// The armed timer while running. At most one exists at a time.
    timer: Mutex<Option<TimerHandle>>,
    playing: watch::Sender<bool>,
}

impl ProgressionSequencer {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        scheduler: Arc<dyn Scheduler>,
        interval: Duration,
    ) -> ProgressionSequencer {
        let (playing, _) = watch::channel(false);
        ProgressionSequencer {
            dispatcher,
            scheduler,
            interval,
            timer: Mutex::new(None),
            playing,
        }
    }

    /// Starts cycling through `primary` followed by `secondary`. Anything
    /// already running is stopped first. The names are copied, so the caller
    /// may change its lists afterwards.
    pub fn start<S: AsRef<str>>(&self, primary: &[S], secondary: &[S]) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }

        let sequence: Arc<[String]> = primary
            .iter()
            .chain(secondary)
            .map(|name| name.as_ref().to_string())
            .collect();

        let span = span!(Level::INFO, "progression", chords = sequence.len());
        let _enter = span.enter();

        if sequence.is_empty() {
            info!("Nothing to play, staying idle");
            self.playing.send_replace(false);
            return;
        }

        info!(
            first = sequence[0].as_str(),
            interval_ms = self.interval.as_millis(),
            "Starting progression"
        );
        self.playing.send_replace(true);
        self.dispatcher.play(&sequence[0]);

        let dispatcher = self.dispatcher.clone();
        let mut index = 0;
        *timer = Some(self.scheduler.schedule_repeating(
            self.interval,
            Box::new(move || {
                index = (index + 1) % sequence.len();
                debug!(index, sound = sequence[index].as_str(), "Advancing progression");
                dispatcher.play(&sequence[index]);
            }),
        ));
    }

    /// Stops the progression. Safe to call when nothing is playing. Sounds
    /// that are already ringing are left to finish.
    pub fn stop(&self) {
        let mut timer = self.timer.lock();
        if let Some(handle) = timer.take() {
            handle.cancel();
            info!("Progression stopped");
        }
        self.playing.send_replace(false);
    }

    pub fn is_playing(&self) -> bool {
        *self.playing.borrow()
    }

    /// Returns a receiver that is notified whenever playback starts or stops.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.playing.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long a progression of `chords` sounds has to run for each of them
    /// to play `cycles` times. The time ends halfway between the last chord
    /// and the one that would follow it. Returns None if it overflows.
    pub fn run_time(&self, chords: usize, cycles: u32) -> Option<Duration> {
        let steps = u32::try_from(chords).ok()?.checked_mul(cycles)?;
        if steps == 0 {
            return Some(Duration::ZERO);
        }
        let total = self.interval.checked_mul(steps)?;
        Some(total - self.interval / 2)
    }
}
