//! TUI rendering logic using ratatui.
//!
//! Lays out the header, statistics lines, the latency heatmap grid, the
//! status bar, and the help overlay from a [`TuiState`].

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::palette::{classify_ms, COLOR_POOR, HEATMAP_CELL};
use super::state::TuiState;
use crate::metrics::Stats;

/// Loss above this percentage renders red instead of yellow.
const LOSS_ALERT_PERCENT: f64 = 5.0;

/// Format a millisecond value for the stats lines.
pub fn format_ms(ms: f64) -> String {
    format!("{:.1}ms", ms)
}

/// Color for a loss percentage: green when clean, yellow on any loss,
/// red past the alert threshold.
pub fn loss_color(loss_percent: f64) -> Color {
    if loss_percent > LOSS_ALERT_PERCENT {
        Color::Red
    } else if loss_percent > 0.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Render the TUI to the terminal.
pub fn render_frame(frame: &mut Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(2), // Stats lines
            Constraint::Min(1),    // Heatmap
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state);
    render_stats(frame, chunks[1], state);
    render_heatmap(frame, chunks[2], state);
    render_status_bar(frame, chunks[3], state);

    if state.show_help {
        render_help_overlay(frame);
    }
}

/// Render the title bar.
fn render_header(frame: &mut Frame, area: Rect, state: &TuiState) {
    let header = Line::from(vec![
        Span::styled("pingmon", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(state.target.as_str(), Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Render the two statistics lines.
fn render_stats(frame: &mut Frame, area: Rect, state: &TuiState) {
    let Some(stats) = state.stats.as_ref().filter(|s| s.total_samples > 0) else {
        let waiting = Paragraph::new(Span::styled(
            "Waiting for data...",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(waiting, area);
        return;
    };

    let lines =
        vec![Line::from(primary_stats_spans(stats)), Line::from(secondary_stats_spans(stats))];
    frame.render_widget(Paragraph::new(lines), area);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(format!("{text} "), Style::default().fg(Color::DarkGray))
}

fn rtt_span(ms: f64) -> Span<'static> {
    Span::styled(format_ms(ms), Style::default().fg(classify_ms(ms)))
}

/// Sent / loss / latency summary.
fn primary_stats_spans(stats: &Stats) -> Vec<Span<'static>> {
    let mut spans = vec![
        label("Sent:"),
        Span::raw(format!("{}  ", stats.total_samples)),
        label("Loss:"),
        Span::styled(
            format!("{:.1}%  ", stats.loss_percent),
            Style::default().fg(loss_color(stats.loss_percent)),
        ),
    ];

    if stats.total_success > 0 {
        spans.extend([
            label("Min:"),
            rtt_span(stats.min_rtt_ms),
            Span::raw("  "),
            label("Avg:"),
            rtt_span(stats.avg_rtt_ms),
            Span::raw("  "),
            label("Max:"),
            rtt_span(stats.max_rtt_ms),
            Span::raw("  "),
            label("σ:"),
            rtt_span(stats.std_dev_ms),
            Span::raw("  "),
            label("Jitter:"),
            rtt_span(stats.jitter_ms),
        ]);
    }

    spans
}

/// Percentiles, instability counters, and streak indicators.
fn secondary_stats_spans(stats: &Stats) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    if stats.total_success > 0 {
        spans.extend([
            label("p50:"),
            rtt_span(stats.percentiles.p50),
            Span::raw("  "),
            label("p90:"),
            rtt_span(stats.percentiles.p90),
            Span::raw("  "),
            label("p95:"),
            rtt_span(stats.percentiles.p95),
            Span::raw("  "),
            label("p99:"),
            rtt_span(stats.percentiles.p99),
            Span::raw("  "),
        ]);
    }

    if stats.loss_bursts > 0 {
        spans.extend([
            label("Outages:"),
            Span::styled(
                format!("{}  ", stats.loss_bursts),
                Style::default().fg(Color::Red),
            ),
        ]);
    }
    if stats.longest_timeout > 0 {
        spans.extend([
            label("MaxDrop:"),
            Span::styled(
                format!("{}  ", stats.longest_timeout),
                Style::default().fg(Color::Red),
            ),
        ]);
    }
    if stats.brownout_bursts > 0 {
        spans.extend([
            label("Brownouts:"),
            Span::styled(
                format!("{}  ", stats.brownout_bursts),
                Style::default().fg(COLOR_POOR),
            ),
        ]);
    }

    if stats.current_streak < -1 {
        spans.push(Span::styled(
            format!("DOWN {}", -stats.current_streak),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    } else if stats.in_brownout {
        spans.push(Span::styled(
            "BROWNOUT",
            Style::default().fg(COLOR_POOR).add_modifier(Modifier::BOLD),
        ));
    }

    spans
}

/// Render the scrollable latency heatmap.
fn render_heatmap(frame: &mut Frame, area: Rect, state: &TuiState) {
    let cols = area.width as usize;
    if cols == 0 {
        return;
    }

    let visible = state.visible_samples();
    let lines: Vec<Line> = visible
        .chunks(cols)
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|sample| {
                        Span::styled(
                            HEATMAP_CELL,
                            Style::default().fg(classify_ms(sample.rtt_ms())),
                        )
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// Render the key hints, scroll indicator, and status message.
fn render_status_bar(frame: &mut Frame, area: Rect, state: &TuiState) {
    let mut spans = vec![Span::styled(
        "q quit · c clear · ↑/↓ scroll · ? help",
        Style::default().fg(Color::DarkGray),
    )];

    if state.scroll_rows > 0 {
        spans.push(Span::styled(
            format!("  [{} rows back, G for live]", state.scroll_rows),
            Style::default().fg(Color::Yellow),
        ));
    }

    if let Some(status) = &state.status {
        let color = if status.is_error { Color::Red } else { Color::Green };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(status.message.clone(), Style::default().fg(color)));
    }

    // Call out a sample stream that went quiet.
    if let Some(last_update) = state.last_update {
        let age = (Utc::now() - last_update).num_seconds();
        if age >= 5 {
            spans.push(Span::styled(
                format!("  no samples for {age}s"),
                Style::default().fg(Color::Red),
            ));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the key-binding overlay on top of the main view.
fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(44, 12, frame.area());
    frame.render_widget(Clear, area);

    let help = Paragraph::new(vec![
        Line::from("q / Ctrl-C   quit"),
        Line::from("c            clear the display history"),
        Line::from("↑/k ↓/j      scroll one row"),
        Line::from("PgUp / PgDn  scroll one page"),
        Line::from("g / Home     oldest samples"),
        Line::from("G / End      newest samples"),
        Line::from("? / h        toggle this help"),
        Line::from("Esc          close help"),
    ])
    .block(
        Block::default()
            .title(" keys ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Left);

    frame.render_widget(help, area);
}

/// A fixed-size rectangle centered in `r`, clamped to fit.
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
