//! Presentation port driven by [`crate::app::App`].

use crate::history::HistoryEntry;

/// Which controls are usable, mirroring the timer's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Controls {
    Running,
    Paused,
    #[default]
    Stopped,
}

impl Controls {
    pub fn start_enabled(self) -> bool {
        self != Self::Running
    }

    pub fn pause_enabled(self) -> bool {
        self == Self::Running
    }

    pub fn stop_enabled(self) -> bool {
        self != Self::Stopped
    }

    pub fn start_label(self) -> &'static str {
        match self {
            Self::Paused => "Continue",
            _ => "Start",
        }
    }
}

pub trait Presenter {
    /// Main countdown text.
    fn show_display(&mut self, text: String);
    /// Secondary elapsed text.
    fn show_elapsed(&mut self, text: String);
    fn set_controls(&mut self, controls: Controls);
    /// Put an entry at the top of the history list.
    fn prepend_entry(&mut self, entry: &HistoryEntry);
    fn remove_entry(&mut self, id: u64);
    fn clear_entries(&mut self);
    /// Draw attention to an expired countdown.
    fn flash_expired(&mut self);
    /// A message the user has to see.
    fn alert(&mut self, message: &str);
}
