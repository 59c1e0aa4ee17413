//! Application controller.
//!
//! One [`App`] owns the timer, the history store, the presenter and the
//! input fields. Front ends forward user actions to the `handle_*` methods
//! and call [`App::on_frame`] once per drawn frame.

use tracing::{debug, error, info};

use crate::{
    clock::Clock,
    error::{Error, Result},
    format::{format_time, input_duration_ms},
    history::{export_csv, HistoryLog, HistoryStore},
    presenter::{Controls, Presenter},
    storage::Storage,
    timer::{Tick, TickHandler, Timer},
};

const INVALID_TIME: &str = "Please enter a valid time (minimum 1 second).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Minutes,
    Seconds,
    Label,
}

impl InputField {
    pub fn next(self) -> Self {
        match self {
            Self::Minutes => Self::Seconds,
            Self::Seconds => Self::Label,
            Self::Label => Self::Minutes,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Minutes => "Minutes",
            Self::Seconds => "Seconds",
            Self::Label => "Label",
        }
    }

    pub fn numeric(self) -> bool {
        self != Self::Label
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    pub minutes: String,
    pub seconds: String,
    pub label: String,
}

impl Inputs {
    pub fn new(minutes: u64, seconds: u64, label: impl Into<String>) -> Self {
        Self {
            minutes: minutes.to_string(),
            seconds: seconds.to_string(),
            label: label.into(),
        }
    }

    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::Minutes => &self.minutes,
            InputField::Seconds => &self.seconds,
            InputField::Label => &self.label,
        }
    }

    fn duration_ms(&self) -> i64 {
        input_duration_ms(&self.minutes, &self.seconds)
    }
}

/// Everything the timer's tick handler may touch. Kept apart from the timer
/// so both can be borrowed mutably at once.
struct Session<C, S: Storage, P> {
    clock: C,
    history: HistoryStore<S>,
    presenter: P,
    inputs: Inputs,
}

impl<C: Clock, S: Storage, P: Presenter> Session<C, S, P> {
    fn show_time(&mut self, remaining_ms: u64, elapsed_ms: u64) {
        self.presenter.show_display(format_time(remaining_ms));
        self.presenter.show_elapsed(format!("Elapsed: {}", format_time(elapsed_ms)));
    }

    fn record(&mut self, remaining_ms: u64, elapsed_ms: u64) {
        let timestamp = self.clock.now_ms();
        let label = self.inputs.label.clone();

        match self.history.add(remaining_ms, elapsed_ms, timestamp, &label) {
            Ok(id) => {
                let log = self.history.load();
                if let Some(entry) = log.get(id) {
                    self.presenter.prepend_entry(entry);
                }
            }
            Err(e) => {
                error!("Failed to record history: {}", e);
                self.presenter.alert(&format!("Could not save history: {e}"));
            }
        }
    }
}

impl<C: Clock, S: Storage, P: Presenter> TickHandler for Session<C, S, P> {
    fn on_tick(&mut self, tick: Tick) {
        if tick.expired {
            self.presenter.flash_expired();
            self.presenter.set_controls(Controls::Stopped);
            self.record(tick.remaining_ms, tick.elapsed_ms);
        }

        self.show_time(tick.remaining_ms, tick.elapsed_ms);
    }
}

pub struct App<C: Clock, S: Storage, P: Presenter> {
    timer: Timer<C>,
    session: Session<C, S, P>,
    clear_pending: bool,
}

impl<C, S, P> App<C, S, P>
where
    C: Clock + Clone,
    S: Storage,
    P: Presenter,
{
    pub fn new(
        clock: C,
        resolution_ms: u64,
        history: HistoryStore<S>,
        presenter: P,
        inputs: Inputs,
    ) -> Self {
        let mut app = Self {
            timer: Timer::with_resolution(clock.clone(), resolution_ms),
            session: Session { clock, history, presenter, inputs },
            clear_pending: false,
        };

        app.session.presenter.set_controls(Controls::Stopped);
        app.session.show_time(0, 0);
        app.handle_input();
        app.load_history();
        app
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn timer(&self) -> &Timer<C> {
        &self.timer
    }

    pub fn presenter(&self) -> &P {
        &self.session.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.session.presenter
    }

    pub fn inputs(&self) -> &Inputs {
        &self.session.inputs
    }

    pub fn history(&self) -> HistoryLog {
        self.session.history.load()
    }

    pub fn clear_pending(&self) -> bool {
        self.clear_pending
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Start a new countdown, or continue a paused one.
    pub fn handle_start(&mut self) -> Result<()> {
        if self.timer.running() {
            return Ok(());
        }

        if self.timer.paused() {
            self.timer.resume(&mut self.session)?;
            self.session.presenter.set_controls(Controls::Running);
            return Ok(());
        }

        let duration = self.session.inputs.duration_ms();
        if duration <= 0 {
            self.session.presenter.alert(INVALID_TIME);
            return Err(Error::InvalidInput(format!("{duration}ms is not a valid duration")));
        }

        info!("Starting countdown of {}ms", duration);
        self.session.show_time(duration as u64, 0);
        self.session.presenter.set_controls(Controls::Running);
        self.timer.start(duration as u64, &mut self.session)
    }

    pub fn handle_pause(&mut self) -> Result<()> {
        if self.timer.running() {
            self.timer.pause()?;
            self.session.presenter.set_controls(Controls::Paused);
        }
        Ok(())
    }

    pub fn handle_stop(&mut self) -> Result<()> {
        if self.timer.stopped() {
            return Ok(());
        }

        self.timer.stop()?;
        let (remaining, elapsed) = (self.timer.remaining_ms(), self.timer.elapsed_ms());
        info!("Countdown stopped with {}ms left", remaining);

        self.session.record(remaining, elapsed);
        self.session.presenter.set_controls(Controls::Stopped);
        self.session.show_time(remaining, elapsed);
        Ok(())
    }

    /// Commit a new value for one of the inputs.
    pub fn set_input(&mut self, field: InputField, value: &str) {
        let inputs = &mut self.session.inputs;
        match field {
            InputField::Minutes => inputs.minutes = value.to_string(),
            InputField::Seconds => inputs.seconds = value.to_string(),
            InputField::Label => {
                inputs.label = value.to_string();
                return;
            }
        }
        self.handle_input();
    }

    /// Keep the duration inputs at one second or more and preview them while
    /// the timer is stopped.
    pub fn handle_input(&mut self) {
        let inputs = &mut self.session.inputs;
        let mut duration = inputs.duration_ms();

        if duration <= 0 {
            inputs.minutes = "0".into();
            inputs.seconds = "1".into();
            duration = 1_000;
        }

        if !self.timer.stopped() {
            return;
        }

        self.session.presenter.show_display(format_time(duration as u64));
    }

    /// First step of clearing: the user still has to confirm.
    pub fn request_clear_history(&mut self) {
        self.clear_pending = true;
    }

    pub fn confirm_clear_history(&mut self, confirmed: bool) {
        if std::mem::take(&mut self.clear_pending) && confirmed {
            self.clear_history();
        }
    }

    pub fn remove_history_entry(&mut self, id: u64) {
        match self.session.history.remove(id) {
            Ok(_) => self.session.presenter.remove_entry(id),
            Err(e) => {
                error!("Failed to remove history entry {}: {}", id, e);
                self.session.presenter.alert(&format!("Could not remove entry: {e}"));
            }
        }
    }

    pub fn export_history_csv(&self) -> String {
        export_csv(&self.session.history.load())
    }

    /// Deliver one host frame to the timer. Returns true while the timer
    /// wants more frames.
    pub fn on_frame(&mut self) -> bool {
        self.timer.frame(&mut self.session)
    }

    // ------------------------------------------------------------------
    // History plumbing
    // ------------------------------------------------------------------

    fn clear_history(&mut self) {
        match self.session.history.clear() {
            Ok(()) => self.session.presenter.clear_entries(),
            Err(e) => {
                error!("Failed to clear history: {}", e);
                self.session.presenter.alert(&format!("Could not clear history: {e}"));
            }
        }
    }

    fn load_history(&mut self) {
        match self.session.history.try_load() {
            Ok(log) => {
                debug!("Loaded {} history entries", log.entries.len());
                for entry in &log.entries {
                    self.session.presenter.prepend_entry(entry);
                }
            }
            Err(e) => {
                error!("Error loading history: {}", e);
                if let Err(e) = self.session.history.clear() {
                    error!("Failed to reset history: {}", e);
                }
                self.session.presenter.clear_entries();
            }
        }
    }
}
