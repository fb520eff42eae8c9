//! UI rendering and layout utilities

use crate::constants::loudness::BAR_COUNT;
use crate::constants::threshold;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
};

/// Snapshot of the meter for one rendered frame
#[derive(Clone)]
pub struct UiState {
    pub device_name: String,
    pub capturing: bool,
    pub level: u32,
    pub bars: [f32; BAR_COUNT],
    pub threshold: u32,
    pub alert_active: bool,
    /// Whole seconds until the alert clears
    pub alert_remaining_secs: u64,
    pub status: String,
}

/// Create a gradient bar showing where the threshold sits
pub fn create_gradient_bar(width: usize, ratio: f64) -> Line<'static> {
    let filled = (ratio * width as f64) as usize;
    let mut spans = Vec::with_capacity(width);

    for i in 0..width {
        let color = if i < width / 3 {
            Color::Green
        } else if i < 2 * width / 3 {
            Color::Yellow
        } else {
            Color::Red
        };

        let ch = if i < filled { '█' } else { '░' };
        spans.push(Span::styled(ch.to_string(), Style::default().fg(color)));
    }

    Line::from(spans)
}

/// Position of `value` along a `width`-wide threshold scale
fn threshold_position(width: usize, value: u32) -> usize {
    let span = f64::from(threshold::MAX - threshold::MIN);
    let ratio = ((f64::from(value) - f64::from(threshold::MIN)) / span).clamp(0.0, 1.0);
    (ratio * width.saturating_sub(1) as f64).round() as usize
}

/// Create threshold scale labels with a marker at the current threshold
pub fn create_threshold_labels(width: usize, value: u32) -> Line<'static> {
    let marker = threshold_position(width, value);
    let mut spans = Vec::with_capacity(width);

    let mut i = 0;
    while i < width {
        if i == marker {
            spans.push(Span::styled("▲", Style::default().fg(Color::White)));
            i += 1;
            continue;
        }

        let label = if i == 0 {
            threshold::MIN.to_string()
        } else if i == width / 2 {
            ((threshold::MIN + threshold::MAX) / 2).to_string()
        } else if i + 3 == width && marker < i {
            threshold::MAX.to_string()
        } else {
            " ".to_string()
        };

        // Labels never run over the marker
        let room = if marker > i { marker - i } else { width - i };
        let label = if label.len() > room { " ".to_string() } else { label };
        i += label.len();
        spans.push(Span::styled(label, Style::default().fg(Color::Gray)));
    }

    Line::from(spans)
}

/// Render the complete UI
pub fn render_ui(f: &mut Frame, state: &UiState) {
    let size = f.size();

    let (accent, background) = if state.alert_active {
        (Color::White, Color::Red)
    } else {
        (Color::Magenta, Color::Reset)
    };
    f.render_widget(Block::default().style(Style::default().bg(background)), size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
            Constraint::Length(3),
        ])
        .split(size);

    // Device and status
    let device_text = if state.capturing {
        state.device_name.as_str()
    } else {
        "Not capturing"
    };
    let device_block = Block::default().title("Device").borders(Borders::ALL);
    f.render_widget(Paragraph::new(device_text).block(device_block), chunks[0]);

    let level_block = Block::default().title("Level").borders(Borders::ALL);
    let level_text = Paragraph::new(Line::from(vec![
        Span::styled(
            state.level.to_string(),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" dB"),
    ]))
    .alignment(Alignment::Center)
    .block(level_block);
    f.render_widget(level_text, chunks[1]);

    // Spectrum bars
    let bar_color = if state.alert_active {
        Color::White
    } else if state.level > state.threshold {
        Color::Red
    } else {
        Color::Magenta
    };
    let bars: Vec<Bar> = state
        .bars
        .iter()
        .map(|&height| {
            Bar::default()
                .value(height.round().clamp(0.0, 100.0) as u64)
                .text_value(String::new())
        })
        .collect();
    let inner_width = (chunks[2].width as usize).saturating_sub(crate::constants::ui::BAR_BORDER_WIDTH);
    let bar_width = (inner_width / BAR_COUNT).saturating_sub(1).max(1) as u16;
    let chart = BarChart::default()
        .block(Block::default().title("Spectrum").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(bar_color))
        .max(100);
    f.render_widget(chart, chunks[2]);

    // Threshold gauge
    let gauge_width = (chunks[3].width as usize).saturating_sub(crate::constants::ui::BAR_BORDER_WIDTH);
    let ratio = threshold_position(gauge_width, state.threshold) as f64 / gauge_width.max(1) as f64;
    let title = if state.alert_active {
        format!("Threshold: {} dB (locked)", state.threshold)
    } else {
        format!("Threshold: {} dB", state.threshold)
    };
    let gauge = Paragraph::new(vec![
        create_gradient_bar(gauge_width, ratio),
        create_threshold_labels(gauge_width, state.threshold),
    ])
    .block(Block::default().title(title).borders(Borders::ALL));
    f.render_widget(gauge, chunks[3]);

    // Alert banner or status
    let footer = if state.alert_active {
        Paragraph::new(format!(
            "NOISE THRESHOLD EXCEEDED, resetting in {}s",
            state.alert_remaining_secs
        ))
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
    } else {
        Paragraph::new(state.status.as_str())
            .block(Block::default().title("Status").borders(Borders::ALL))
    };
    f.render_widget(footer, chunks[4]);
}
