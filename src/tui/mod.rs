//! TUI (Terminal User Interface) module for pingmon.
//!
//! Provides the live view: a scrollable latency heatmap, the statistics
//! lines, and keyboard handling. The UI consumes the (lossy) sample and
//! stats channels and owns its own scroll-back ring buffer.

pub mod controller;
pub mod palette;
pub mod renderer;
pub mod state;

pub use controller::TuiController;
pub use state::TuiState;
