use std::{
    fs::{self, OpenOptions},
    io,
    path::Path,
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use notify_rust::{Notification, Urgency};
use ratatui::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rcountdown::{
    config::{Args, Config},
    format::{format_time, format_timestamp},
    history::HistoryStore,
    ui::{self, Action, Screen},
    App, FileStorage, Inputs, Presenter, SystemClock,
};

// ============================================================================
// Type Aliases & Constants
// ============================================================================

type TerminalApp = App<SystemClock, FileStorage, Screen>;
const LOG_FILE: &str = "rcountdown.log";
const EXPORT_FILE: &str = "history_export.csv";

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data_dir = args.data_dir();
    let storage = FileStorage::new(data_dir.clone())
        .with_context(|| format!("cannot use data directory {}", data_dir.display()))?;

    init_logging(storage.dir(), args.log_level())?;

    let config = Config::load(&storage).with_args(&args);
    info!("Starting rcountdown v{} (data dir {})", env!("CARGO_PKG_VERSION"), data_dir.display());

    let mut history = HistoryStore::new(storage);

    if args.clear_history {
        history.clear()?;
        println!("History cleared.");
        return Ok(());
    }

    if args.history {
        print_history(&history);
        return Ok(());
    }

    let mut app = App::new(
        SystemClock::new(),
        config.resolution_ms,
        history,
        Screen::new(),
        Inputs::new(config.minutes, config.seconds, config.label.clone()),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut app, &config, &data_dir);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        error!("Exiting after error: {:#}", e);
    }
    info!("rcountdown stopped");
    res
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TerminalApp,
    config: &Config,
    data_dir: &Path,
) -> anyhow::Result<()> {
    let frame_rate = Duration::from_millis(config.frame_rate_ms.max(1));
    let mut last_frame = Instant::now();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        let timeout = frame_rate.saturating_sub(last_frame.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match ui::handle_key(key, app) {
                        Action::Quit => return Ok(()),
                        Action::Export => export_history(app, data_dir),
                        Action::None => {}
                    }
                }
            }
        }

        if last_frame.elapsed() >= frame_rate {
            app.on_frame();
            if app.presenter_mut().take_alarm() {
                let label = &app.inputs().label;
                let body = if label.is_empty() { "Countdown finished.".to_string() } else { format!("{label} finished.") };
                notify("⏱ Time's up!", &body, config.sound_enabled);
            }
            last_frame = Instant::now();
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn init_logging(dir: &Path, level: &str) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rcountdown={level}")));

    // The terminal belongs to the UI, so logs go to a file
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_history(history: &HistoryStore<FileStorage>) {
    let log = history.load();
    if log.is_empty() {
        println!("No sessions yet!");
        return;
    }

    for entry in log.recent_first() {
        let label = if entry.label.is_empty() { String::new() } else { format!(" ({})", entry.label) };
        println!(
            "#{:<4} {}{}  Time Left: {}  Elapsed: {}",
            entry.id,
            format_timestamp(entry.timestamp),
            label,
            format_time(entry.remaining),
            format_time(entry.elapsed)
        );
    }
}

fn export_history(app: &mut TerminalApp, data_dir: &Path) {
    let path = data_dir.join(EXPORT_FILE);
    match fs::write(&path, app.export_history_csv()) {
        Ok(()) => info!("Exported history to {}", path.display()),
        Err(e) => {
            error!("Failed to export history: {}", e);
            app.presenter_mut().alert(&format!("Export failed: {e}"));
        }
    }
}

fn notify(title: &str, body: &str, sound: bool) {
    if let Err(e) = Notification::new()
        .summary(title)
        .body(body)
        .appname("rcountdown")
        .icon("alarm-clock")
        .urgency(Urgency::Critical)
        .show()
    {
        info!("Desktop notification unavailable: {}", e);
    }

    if sound {
        std::thread::spawn(|| {
            for (cmd, file) in [
                ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
                ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
                ("aplay", "/usr/share/sounds/generic.wav"),
            ] {
                if Path::new(file).exists() {
                    let _ = std::process::Command::new(cmd)
                        .arg(file)
                        .stdout(std::process::Stdio::null())
                        .stderr(std::process::Stdio::null())
                        .spawn();
                    break;
                }
            }
        });
    }
}
