//! Countdown timer state machine.
//!
//! The timer never sleeps and never touches the screen or the disk. It reads
//! a [`Clock`], keeps a [`FrameLoop`] alive while running, and reports every
//! frame to a [`TickHandler`]. The host is expected to call [`Timer::frame`]
//! once per drawn frame.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    clock::{Clock, SystemClock},
    error::{Error, Result},
    frame::{Frame, FrameLoop},
};

pub const DEFAULT_RESOLUTION_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        })
    }
}

/// What the handler sees on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub expired: bool,
    pub remaining_ms: u64,
    pub elapsed_ms: u64,
}

pub trait TickHandler {
    fn on_tick(&mut self, tick: Tick);
}

impl<F> TickHandler for F
where
    F: FnMut(Tick),
{
    fn on_tick(&mut self, tick: Tick) {
        self(tick)
    }
}

#[derive(Debug)]
pub struct Timer<C: Clock = SystemClock> {
    clock: C,
    resolution_ms: u64,
    duration_ms: u64,
    started_at_ms: i64,
    elapsed_ms: u64,
    status: TimerStatus,
    frames: FrameLoop,
}

impl<C: Clock> Timer<C> {
    pub fn new(clock: C) -> Self {
        Self::with_resolution(clock, DEFAULT_RESOLUTION_MS)
    }

    pub fn with_resolution(clock: C, resolution_ms: u64) -> Self {
        Self {
            clock,
            resolution_ms: resolution_ms.max(1),
            duration_ms: 0,
            started_at_ms: 0,
            elapsed_ms: 0,
            status: TimerStatus::Stopped,
            frames: FrameLoop::new(),
        }
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    pub fn stopped(&self) -> bool {
        !self.running() && !self.paused()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.round(self.raw_elapsed_ms())
    }

    pub fn remaining_ms(&self) -> u64 {
        self.round(self.unrounded_remaining_ms())
    }

    pub fn expired(&self) -> bool {
        self.unrounded_remaining_ms() == 0
    }

    /// True while a frame has been requested and not yet delivered.
    pub fn frame_pending(&self) -> bool {
        self.frames.is_pending()
    }

    fn raw_elapsed_ms(&self) -> u64 {
        if self.running() {
            self.since_start()
        } else {
            self.elapsed_ms
        }
    }

    fn unrounded_remaining_ms(&self) -> u64 {
        self.duration_ms.saturating_sub(self.elapsed_ms())
    }

    fn since_start(&self) -> u64 {
        (self.clock.now_ms() - self.started_at_ms).max(0) as u64
    }

    fn round(&self, value: u64) -> u64 {
        value / self.resolution_ms * self.resolution_ms
    }

    fn snapshot(&self, expired: bool) -> Tick {
        Tick {
            expired,
            remaining_ms: self.remaining_ms(),
            elapsed_ms: self.elapsed_ms(),
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    pub fn start<H>(&mut self, duration_ms: u64, handler: &mut H) -> Result<()>
    where
        H: TickHandler + ?Sized,
    {
        if !self.stopped() {
            return Err(Error::invalid_state("start", self.status));
        }
        if duration_ms == 0 {
            return Err(Error::InvalidInput("duration must be greater than zero".into()));
        }

        self.duration_ms = duration_ms;
        self.started_at_ms = self.clock.now_ms();
        self.elapsed_ms = 0;
        self.status = TimerStatus::Running;
        debug!("Timer started for {}ms", duration_ms);

        self.kick(handler);
        Ok(())
    }

    /// Continue a paused countdown. Already running is a no-op.
    pub fn resume<H>(&mut self, handler: &mut H) -> Result<()>
    where
        H: TickHandler + ?Sized,
    {
        if !self.paused() {
            if !self.running() {
                return Err(Error::invalid_state("continue", self.status));
            }
            return Ok(());
        }

        self.started_at_ms = self.clock.now_ms() - self.elapsed_ms as i64;
        self.status = TimerStatus::Running;
        debug!("Timer continued at {}ms elapsed", self.elapsed_ms);

        self.kick(handler);
        Ok(())
    }

    /// Freeze the countdown. Already paused is a no-op.
    pub fn pause(&mut self) -> Result<()> {
        if !self.running() {
            if !self.paused() {
                return Err(Error::invalid_state("pause", self.status));
            }
            return Ok(());
        }

        self.elapsed_ms = self.since_start();
        self.status = TimerStatus::Paused;
        debug!("Timer paused at {}ms elapsed", self.elapsed_ms);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.stopped() {
            return Err(Error::invalid_state("stop", self.status));
        }
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        if self.running() {
            self.elapsed_ms = self.since_start();
        }
        self.elapsed_ms = self.elapsed_ms.min(self.duration_ms);
        self.status = TimerStatus::Stopped;
        debug!("Timer stopped at {}ms elapsed", self.elapsed_ms);
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Deliver one host frame. Returns true if the timer wants another.
    pub fn frame<H>(&mut self, handler: &mut H) -> bool
    where
        H: TickHandler + ?Sized,
    {
        let mut frames = std::mem::take(&mut self.frames);
        let again = frames.drive(|| self.tick(handler));
        self.frames = frames;
        again
    }

    fn kick<H>(&mut self, handler: &mut H)
    where
        H: TickHandler + ?Sized,
    {
        if self.tick(handler) == Frame::Again {
            self.frames.request();
        }
    }

    fn tick<H>(&mut self, handler: &mut H) -> Frame
    where
        H: TickHandler + ?Sized,
    {
        if !self.running() {
            handler.on_tick(self.snapshot(false));
            return Frame::Done;
        }

        if self.expired() {
            self.finish();
            info!("Timer expired after {}ms", self.elapsed_ms);
            handler.on_tick(self.snapshot(true));
            return Frame::Done;
        }

        handler.on_tick(self.snapshot(false));
        Frame::Again
    }
}
