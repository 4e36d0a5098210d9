//! TUI controller for managing the display lifecycle.
//!
//! Owns terminal setup/teardown (raw mode, alternate screen) and the event
//! loop that multiplexes keyboard input, the sample and stats channels,
//! and the redraw tick.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::{
    cursor,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use log::warn;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::renderer::render_frame;
use super::state::TuiState;
use crate::errors::MonitorError;
use crate::metrics::Stats;
use crate::sample::Sample;

/// How often the display refreshes.
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Controller for the TUI display.
pub struct TuiController {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl TuiController {
    /// Enter raw mode and the alternate screen.
    pub fn new() -> Result<Self, MonitorError> {
        enable_raw_mode().map_err(|e| {
            MonitorError::terminal("failed to enable raw mode").with_source(e)
        })?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide).map_err(|e| {
            let _ = disable_raw_mode();
            MonitorError::terminal("failed to enter alternate screen").with_source(e)
        })?;

        let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(|e| {
            let _ = disable_raw_mode();
            MonitorError::terminal("failed to initialize terminal").with_source(e)
        })?;

        Ok(Self { terminal, restored: false })
    }

    /// Run the event loop until the user quits or the pipeline ends.
    pub async fn run(
        &mut self,
        state: &mut TuiState,
        mut samples: mpsc::Receiver<Sample>,
        mut stats: mpsc::Receiver<Stats>,
    ) -> Result<(), MonitorError> {
        let size = self.terminal.size().map_err(|e| {
            MonitorError::terminal("failed to read terminal size").with_source(e)
        })?;
        state.set_size(size.width, size.height);
        self.draw(state)?;

        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(REDRAW_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_open = true;

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) => {
                        if handle_key(state, key) {
                            break;
                        }
                        self.draw(state)?;
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        state.set_size(width, height);
                        self.draw(state)?;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("terminal event error: {e}"),
                    None => break,
                },
                sample = samples.recv() => match sample {
                    Some(sample) => state.on_sample(sample),
                    // The pipeline ended underneath the UI (shutdown or a
                    // runner failure); leave so the app can report it.
                    None => break,
                },
                snapshot = stats.recv(), if stats_open => match snapshot {
                    Some(snapshot) => state.on_stats(snapshot),
                    None => stats_open = false,
                },
                _ = tick.tick() => self.draw(state)?,
            }
        }

        Ok(())
    }

    fn draw(&mut self, state: &TuiState) -> Result<(), MonitorError> {
        self.terminal
            .draw(|frame| render_frame(frame, state))
            .map_err(|e| MonitorError::terminal("failed to draw frame").with_source(e))?;
        Ok(())
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show);
        self.restored = true;
    }
}

impl Drop for TuiController {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Process one key event; returns true when the user asked to quit.
fn handle_key(state: &mut TuiState, key: KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return true;
        }
        KeyCode::Char('c') => state.clear(),
        KeyCode::Char('?') | KeyCode::Char('h') => state.show_help = !state.show_help,
        KeyCode::Up | KeyCode::Char('k') => state.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => state.scroll_down(1),
        KeyCode::PageUp => state.scroll_up(state.page_rows()),
        KeyCode::PageDown => state.scroll_down(state.page_rows()),
        KeyCode::Home | KeyCode::Char('g') => state.scroll_oldest(),
        KeyCode::End | KeyCode::Char('G') => state.scroll_newest(),
        KeyCode::Esc => {
            if state.show_help {
                state.show_help = false;
            }
        }
        _ => {}
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_state() -> TuiState {
        // 10 columns × 4 grid rows; 60 samples → 6 total rows, max scroll 2.
        let mut state = TuiState::new("example.com", 100);
        state.set_size(10, 8);
        for i in 0..60 {
            state.on_sample(Sample::reply(i, Duration::from_millis(10)));
        }
        state
    }

    #[test]
    fn quit_keys() {
        let mut state = test_state();
        assert!(handle_key(&mut state, key(KeyCode::Char('q'))));
        assert!(handle_key(
            &mut state,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(!handle_key(&mut state, key(KeyCode::Char('x'))));
    }

    #[test]
    fn plain_c_clears_instead_of_quitting() {
        let mut state = test_state();
        assert!(!handle_key(&mut state, key(KeyCode::Char('c'))));
        assert_eq!(state.samples.len(), 0);
    }

    #[test]
    fn help_toggles_and_escape_dismisses() {
        let mut state = test_state();
        handle_key(&mut state, key(KeyCode::Char('?')));
        assert!(state.show_help);
        handle_key(&mut state, key(KeyCode::Esc));
        assert!(!state.show_help);
        handle_key(&mut state, key(KeyCode::Char('h')));
        assert!(state.show_help);
        handle_key(&mut state, key(KeyCode::Char('h')));
        assert!(!state.show_help);
    }

    #[test]
    fn scroll_keys_move_the_view() {
        let mut state = test_state();
        handle_key(&mut state, key(KeyCode::Up));
        assert_eq!(state.scroll_rows, 1);
        handle_key(&mut state, key(KeyCode::Char('k')));
        assert_eq!(state.scroll_rows, 2);
        handle_key(&mut state, key(KeyCode::Down));
        assert_eq!(state.scroll_rows, 1);
        handle_key(&mut state, key(KeyCode::Char('G')));
        assert_eq!(state.scroll_rows, 0);
        handle_key(&mut state, key(KeyCode::Char('g')));
        assert_eq!(state.scroll_rows, state.max_scroll());
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = test_state();
        let mut release = key(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        assert!(!handle_key(&mut state, release));
    }
}
