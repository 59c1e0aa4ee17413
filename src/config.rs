//! Configuration and CLI argument handling.
//!
//! Settings come from `config.json` in the data directory and are then
//! overridden by command-line flags.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::{
    format::parse_duration,
    storage::{load_json, Storage},
    timer::DEFAULT_RESOLUTION_MS,
};

pub const CONFIG_KEY: &str = "config";
pub const DEFAULT_DATA_DIR: &str = "rcountdown";

#[derive(Parser, Clone, Debug, Default)]
#[command(author, version, about = "⏱ rcountdown - A terminal countdown timer with history")]
pub struct Args {
    /// Initial minutes
    #[arg(short, long)]
    pub minutes: Option<u64>,
    /// Initial seconds
    #[arg(short, long)]
    pub seconds: Option<u64>,
    /// Initial duration such as 1m30s, overrides --minutes/--seconds
    #[arg(short, long, value_parser = parse_duration_arg)]
    pub duration: Option<u64>,
    /// Label stored with each history entry
    #[arg(short, long)]
    pub label: Option<String>,
    /// Rounding granularity in milliseconds
    #[arg(long)]
    pub resolution: Option<u64>,
    /// Where history, config and logs live
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub no_sound: bool,
    /// Print the history and exit
    #[arg(long)]
    pub history: bool,
    /// Clear the history and exit
    #[arg(long)]
    pub clear_history: bool,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_duration_arg(s: &str) -> std::result::Result<u64, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

impl Args {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".").join(DEFAULT_DATA_DIR))
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub resolution_ms: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub label: String,
    pub sound_enabled: bool,
    pub frame_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution_ms: DEFAULT_RESOLUTION_MS,
            minutes: 5,
            seconds: 0,
            label: String::new(),
            sound_enabled: true,
            frame_rate_ms: 16,
        }
    }
}

impl Config {
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Self {
        load_json(storage, CONFIG_KEY)
    }

    /// Apply command-line overrides on top of file values.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(m) = args.minutes { self.minutes = m; }
        if let Some(s) = args.seconds { self.seconds = s; }
        if let Some(d) = args.duration {
            let secs = d.div_ceil(1_000);
            self.minutes = secs / 60;
            self.seconds = secs % 60;
        }
        if let Some(l) = &args.label { self.label = l.clone(); }
        if let Some(r) = args.resolution { self.resolution_ms = r; }
        if args.no_sound { self.sound_enabled = false; }
        self
    }
}
