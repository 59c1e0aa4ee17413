//! rcountdown - a terminal countdown timer with persistent session history.
//!
//! The timer state machine, the history store and the application
//! controller are independent of the terminal; the [`ui`] module is one
//! front end driving them through the [`presenter::Presenter`] port.

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod history;
pub mod presenter;
pub mod storage;
pub mod timer;
pub mod ui;

pub use app::{App, InputField, Inputs};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryLog, HistoryStore};
pub use presenter::{Controls, Presenter};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use timer::{Tick, TickHandler, Timer, TimerStatus};
