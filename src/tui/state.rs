//! TUI state.
//!
//! Holds everything the renderer needs: the scroll-back ring buffer, the
//! latest statistics snapshot, and view state (scroll, help, status). All
//! methods are pure in-memory updates so the state is testable without a
//! terminal.

use chrono::{DateTime, Utc};

use crate::buffer::RingBuffer;
use crate::metrics::Stats;
use crate::sample::Sample;

/// Rows consumed by the header, stats lines, and status bar around the
/// heatmap grid.
pub const CHROME_ROWS: u16 = 4;

/// A transient message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
}

/// State for the TUI display.
pub struct TuiState {
    /// Target host, for the header.
    pub target: String,
    /// Scroll-back history; owned by the UI, fed by the distributor.
    pub samples: RingBuffer<Sample>,
    /// Latest statistics snapshot, if any arrived yet.
    pub stats: Option<Stats>,
    /// Rows scrolled back from the newest samples (0 = newest).
    pub scroll_rows: usize,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Transient status line content.
    pub status: Option<Status>,
    /// Terminal dimensions.
    pub width: u16,
    pub height: u16,
    /// When the last sample arrived.
    pub last_update: Option<DateTime<Utc>>,
}

impl TuiState {
    pub fn new(target: impl Into<String>, history_size: usize) -> Self {
        Self {
            target: target.into(),
            samples: RingBuffer::new(history_size),
            stats: None,
            scroll_rows: 0,
            show_help: false,
            status: None,
            width: 0,
            height: 0,
            last_update: None,
        }
    }

    /// Record an incoming sample.
    pub fn on_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
        self.last_update = Some(Utc::now());
    }

    /// Record a statistics snapshot.
    pub fn on_stats(&mut self, stats: Stats) {
        self.stats = Some(stats);
    }

    /// Clear the scroll-back display.
    ///
    /// This empties only the UI's ring buffer; cumulative statistics live
    /// in the metrics engine and deliberately survive a display clear.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.scroll_rows = 0;
        self.status = Some(Status { message: "Cleared".to_string(), is_error: false });
    }

    /// Track a terminal resize, keeping the scroll position in range.
    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.scroll_rows = self.scroll_rows.min(self.max_scroll());
    }

    /// Heatmap grid dimensions (columns, rows) for the current size.
    pub fn grid_dims(&self) -> (usize, usize) {
        let cols = self.width as usize;
        let rows = self.height.saturating_sub(CHROME_ROWS) as usize;
        (cols, rows)
    }

    /// Total rows the full history would occupy.
    fn total_rows(&self) -> usize {
        let (cols, _) = self.grid_dims();
        if cols == 0 {
            return 0;
        }
        self.samples.len().div_ceil(cols)
    }

    /// Furthest the view can scroll back, in rows.
    pub fn max_scroll(&self) -> usize {
        let (_, rows) = self.grid_dims();
        self.total_rows().saturating_sub(rows)
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_rows = (self.scroll_rows + rows).min(self.max_scroll());
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_rows = self.scroll_rows.saturating_sub(rows);
    }

    /// Jump to the oldest held samples.
    pub fn scroll_oldest(&mut self) {
        self.scroll_rows = self.max_scroll();
    }

    /// Jump back to the live view.
    pub fn scroll_newest(&mut self) {
        self.scroll_rows = 0;
    }

    /// One page worth of rows, for PgUp/PgDn.
    pub fn page_rows(&self) -> usize {
        self.grid_dims().1.max(1)
    }

    /// The window of samples the grid currently shows, oldest-first.
    pub fn visible_samples(&self) -> Vec<Sample> {
        let (cols, rows) = self.grid_dims();
        if cols == 0 || rows == 0 {
            return Vec::new();
        }

        let len = self.samples.len();
        let end = len.saturating_sub(self.scroll_rows * cols);
        if end == 0 {
            return Vec::new();
        }
        let start = end.saturating_sub(cols * rows);
        self.samples.get_range(start, end - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(ms: u64) -> Sample {
        Sample::reply(0, Duration::from_millis(ms))
    }

    fn state_with_samples(count: usize, width: u16, height: u16) -> TuiState {
        let mut state = TuiState::new("example.com", 1000);
        state.set_size(width, height);
        for i in 0..count {
            state.on_sample(sample(i as u64 + 1));
        }
        state
    }

    #[test]
    fn clear_empties_display_but_not_stats() {
        let mut state = state_with_samples(10, 20, 10);
        let stats = crate::metrics::Engine::new().stats();
        state.on_stats(stats);

        state.clear();

        assert_eq!(state.samples.len(), 0);
        assert_eq!(state.scroll_rows, 0);
        assert!(state.stats.is_some(), "stats snapshot must survive a display clear");
        assert_eq!(
            state.status,
            Some(Status { message: "Cleared".to_string(), is_error: false })
        );
    }

    #[test]
    fn grid_dims_reserve_chrome_rows() {
        let state = state_with_samples(0, 80, 24);
        assert_eq!(state.grid_dims(), (80, 20));
    }

    #[test]
    fn scroll_clamps_to_history() {
        // 10 columns × 2 grid rows, 50 samples → 5 total rows, max scroll 3.
        let mut state = state_with_samples(50, 10, 2 + CHROME_ROWS);
        assert_eq!(state.max_scroll(), 3);

        state.scroll_up(100);
        assert_eq!(state.scroll_rows, 3);

        state.scroll_down(1);
        assert_eq!(state.scroll_rows, 2);

        state.scroll_newest();
        assert_eq!(state.scroll_rows, 0);

        state.scroll_oldest();
        assert_eq!(state.scroll_rows, 3);
    }

    #[test]
    fn resize_keeps_scroll_in_range() {
        let mut state = state_with_samples(50, 10, 2 + CHROME_ROWS);
        state.scroll_oldest();

        // A taller window shows more rows, so the old offset is too deep.
        state.set_size(10, 4 + CHROME_ROWS);
        assert!(state.scroll_rows <= state.max_scroll());
    }

    #[test]
    fn visible_window_follows_scroll() {
        // 5 columns × 2 rows visible, 20 samples pushed (values 1..=20).
        let mut state = state_with_samples(20, 5, 2 + CHROME_ROWS);

        let newest: Vec<u64> =
            state.visible_samples().iter().map(|s| s.rtt.as_millis() as u64).collect();
        assert_eq!(newest, (11..=20).collect::<Vec<_>>());

        state.scroll_up(1);
        let back_one: Vec<u64> =
            state.visible_samples().iter().map(|s| s.rtt.as_millis() as u64).collect();
        assert_eq!(back_one, (6..=15).collect::<Vec<_>>());

        state.scroll_oldest();
        let oldest: Vec<u64> =
            state.visible_samples().iter().map(|s| s.rtt.as_millis() as u64).collect();
        assert_eq!(oldest, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn empty_state_has_no_visible_samples() {
        let state = state_with_samples(0, 80, 24);
        assert!(state.visible_samples().is_empty());
        assert_eq!(state.max_scroll(), 0);
    }
}
