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

//! Repeating timers with synchronous cancellation.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use tracing::debug;

/// The closure run on every timer fire.
pub type Tick = Box<dyn FnMut() + Send>;

/// Arms repeating timers.
pub trait Scheduler: Send + Sync {
    /// Runs `tick` every `period` until the returned handle is cancelled or
    /// dropped. The first run happens one period from now.
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> TimerHandle;
}

/// State shared between a timer handle and whatever fires the timer.
///
/// The tick lives behind the same lock that is held while it runs. Cancelling
/// takes that lock and drops the tick, so once cancel returns the tick is
/// neither running nor able to run again.
pub struct Timer {
    tick: Mutex<Option<Tick>>,
}

impl Timer {
    fn new(tick: Tick) -> Timer {
        Timer {
            tick: Mutex::new(Some(tick)),
        }
    }

    /// Runs the tick once. Returns false if the timer was cancelled.
    pub fn fire(&self) -> bool {
        match self.tick.lock().as_mut() {
            Some(tick) => {
                tick();
                true
            }
            None => false,
        }
    }

    fn cancel(&self) -> bool {
        self.tick.lock().take().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.tick.lock().is_none()
    }
}

/// Owns an armed timer. Cancels it when dropped.
///
/// Must not be cancelled from inside its own tick, that would deadlock.
pub struct TimerHandle {
    timer: Arc<Timer>,
    /// Wakes the thread driving the timer so it can exit early.
    wake: Option<Sender<()>>,
}

impl TimerHandle {
    fn new(timer: Arc<Timer>, wake: Option<Sender<()>>) -> TimerHandle {
        TimerHandle { timer, wake }
    }

    /// Cancels the timer. Idempotent. When this returns, no tick is running
    /// and none will run again.
    pub fn cancel(&self) {
        if self.timer.cancel() {
            debug!("Timer cancelled");
        }
        if let Some(wake) = &self.wake {
            let _ = wake.try_send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.timer.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Drives each timer from its own thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule_repeating(&self, period: Duration, tick_fn: Tick) -> TimerHandle {
        let timer = Arc::new(Timer::new(tick_fn));
        let (wake_tx, wake_rx) = bounded::<()>(1);

        {
            let timer = timer.clone();
            thread::spawn(move || {
                let ticker = tick(period);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            if !timer.fire() {
                                break;
                            }
                        }
                        recv(wake_rx) -> _ => break,
                    }
                }
                debug!("Timer thread exiting");
            });
        }

        TimerHandle::new(timer, Some(wake_tx))
    }
}

/// A scheduler that only fires when told to. Lets tests step through time.
#[cfg(test)]
#[derive(Default)]
pub struct ManualScheduler {
    timers: Mutex<Vec<(Duration, Arc<Timer>)>>,
}

#[cfg(test)]
impl ManualScheduler {
    pub fn new() -> ManualScheduler {
        ManualScheduler::default()
    }

    /// Fires every live timer `fires` times, in the order they were armed.
    pub fn advance(&self, fires: usize) {
        for _ in 0..fires {
            let timers: Vec<Arc<Timer>> = self
                .timers
                .lock()
                .iter()
                .map(|(_, timer)| timer.clone())
                .collect();
            for timer in timers {
                timer.fire();
            }
        }
    }

    /// Returns the periods of the timers that are still armed.
    pub fn armed(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .iter()
            .filter(|(_, timer)| !timer.is_cancelled())
            .map(|(period, _)| *period)
            .collect()
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: Tick) -> TimerHandle {
        let timer = Arc::new(Timer::new(tick));
        self.timers.lock().push((period, timer.clone()));
        TimerHandle::new(timer, None)
    }
}
