//! Main application logic and orchestration

use crate::capture::{CaptureProvider, CpalCaptureProvider};
use crate::config::Config;
use crate::error::AppResult;
use crate::meter::Meter;
use crate::state::AppState;
use crate::tone::{CpalTonePlayer, ToneSink};
use crate::ui;
use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::future::Future;
use std::io;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Main application struct
pub struct App {
    config: Config,
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
}

/// Exit codes for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    UserExit = 1, // User pressed Escape or Ctrl+C
    Error = 2,    // Actual application error
}

/// What a key press asks the meter to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ToggleCapture,
    RaiseThreshold,
    LowerThreshold,
    Quit,
    Interrupt,
}

/// Map a key event to an intent
pub fn intent_for_key(key: KeyEvent) -> Option<Intent> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Intent::Interrupt),
        KeyCode::Esc => Some(Intent::Interrupt),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Intent::ToggleCapture),
        KeyCode::Up | KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
            Some(Intent::RaiseThreshold)
        }
        KeyCode::Down | KeyCode::Left | KeyCode::Char('-') => Some(Intent::LowerThreshold),
        KeyCode::Char('q') => Some(Intent::Quit),
        _ => None,
    }
}

/// Current time on the runtime clock, which tests can pause and advance
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Wait until `deadline`, or forever when there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Resolve when `signal` fires. A signal handler that fails to install is
/// logged and never resolves.
async fn shutdown_on<S>(signal: S)
where
    S: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Interrupt handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Run the sampling loop until `shutdown` resolves or `on_frame` returns an
/// exit code. Every frame samples the meter before `on_frame` sees it; the
/// alert reset fires on its own deadline. The meter is stopped on the way out.
pub async fn drive<P, T, S, F>(
    meter: &mut Meter<P, T>,
    frame_interval: Duration,
    shutdown: S,
    mut on_frame: F,
) -> AppResult<ExitCode>
where
    P: CaptureProvider,
    T: ToneSink,
    S: Future<Output = ()>,
    F: FnMut(&mut Meter<P, T>, Instant) -> AppResult<Option<ExitCode>>,
{
    let mut frames = tokio::time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                break Ok(ExitCode::UserExit);
            }
            _ = wait_for(meter.alert_deadline()) => {
                meter.expire_alert(clock_now());
            }
            _ = frames.tick() => {
                let now = clock_now();
                meter.tick(now);

                match on_frame(meter, now) {
                    Ok(Some(exit)) => break Ok(exit),
                    Ok(None) => {}
                    Err(e) => break Err(e),
                }
            }
        }
    };

    meter.stop();
    result
}

/// Drain pending key events; returns an exit code when the user quits
fn handle_input<P: CaptureProvider, T: ToneSink>(
    meter: &mut Meter<P, T>,
    app_state: &mut AppState,
) -> AppResult<Option<ExitCode>> {
    while crossterm::event::poll(Duration::from_millis(0))? {
        let Event::Key(key_event) = crossterm::event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match intent_for_key(key_event) {
            Some(Intent::Quit) => return Ok(Some(ExitCode::Success)),
            Some(Intent::Interrupt) => return Ok(Some(ExitCode::UserExit)),
            Some(Intent::ToggleCapture) => {
                let was_capturing = meter.is_capturing();
                let capturing = meter.toggle();
                app_state.toggled(was_capturing, capturing);
            }
            Some(Intent::RaiseThreshold) => {
                let result = meter.set_threshold(meter.threshold().saturating_add(1));
                app_state.threshold_result(result);
            }
            Some(Intent::LowerThreshold) => {
                let result = meter.set_threshold(meter.threshold().saturating_sub(1));
                app_state.threshold_result(result);
            }
            None => {}
        }
    }

    Ok(None)
}

impl App {
    /// Initialize the terminal for the given configuration
    pub fn new_with_config(config: Config) -> AppResult<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(App { config, terminal })
    }

    /// Run the monitor until the user quits
    pub async fn run(mut self) -> (AppResult<()>, ExitCode) {
        let result = self.run_loop().await;
        let _ = self.cleanup(); // Ignore cleanup errors

        match result {
            Ok(exit_code) => (Ok(()), exit_code),
            Err(e) => (Err(e), ExitCode::Error),
        }
    }

    async fn run_loop(&mut self) -> AppResult<ExitCode> {
        let provider = CpalCaptureProvider::new(self.config.device_name.clone());
        let mut meter = Meter::new(provider, CpalTonePlayer, self.config.threshold);
        let mut app_state = AppState::new();

        if self.config.autostart {
            let capturing = meter.start();
            app_state.toggled(false, capturing);
        }

        let terminal = &mut self.terminal;
        drive(
            &mut meter,
            Duration::from_millis(crate::constants::ui::FRAME_INTERVAL_MS),
            shutdown_on(tokio::signal::ctrl_c()),
            |meter, now| {
                let ui_state = app_state.snapshot(meter, now);
                terminal.draw(|f| ui::render_ui(f, &ui_state))?;
                handle_input(meter, &mut app_state)
            },
        )
        .await
    }

    /// Clean up terminal state
    fn cleanup(&mut self) -> AppResult<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
