//! Ratatui frame for the monitor.
//!
//! Layout, top to bottom: header, the volume/open-interest ratio chart, the
//! open-interest change chart, the trailing-window report lines, warnings,
//! and the status footer. All widgets are pure views over the tick's
//! projected data.

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::engine::report::WindowReport;
use crate::engine::signals::{ChartSeries, SignalFrame};
use crate::feed::client::ConnectionStatus;

const C_PUT: Color = Color::Rgb(220, 100, 100);
const C_CALL: Color = Color::Rgb(100, 220, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);
const C_WARN: Color = Color::Rgb(180, 180, 100);

/// Everything one frame needs, assembled by the loop after each tick.
pub struct FrameData<'a> {
    pub underlying: &'a str,
    pub expiration: &'a str,
    pub signals: &'a SignalFrame,
    pub reports: &'a [WindowReport],
    /// One label per strike row, e.g. `450`.
    pub strike_labels: &'a [String],
    /// Labels of instruments with no delta this tick.
    pub missing_delta: &'a [String],
    pub status: ConnectionStatus,
    pub session_start: DateTime<Local>,
    pub elapsed_secs: u64,
    pub put_call_oi_ratio: f64,
}

pub fn draw(f: &mut Frame, data: &FrameData) {
    let report_rows = data.reports.len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Min(8),
            Constraint::Length(report_rows),
            Constraint::Length(2),
        ])
        .split(f.area());

    render_header(f, data, chunks[0]);
    render_chart(
        f,
        chunks[1],
        " VOLUME / OPEN INTEREST ",
        &data.signals.volume_to_oi,
        data,
        1,
    );
    render_chart(
        f,
        chunks[2],
        " \u{0394} OPEN INTEREST (session) ",
        &data.signals.oi_change,
        data,
        0,
    );
    render_reports(f, data.reports, chunks[3]);
    render_footer(f, data, chunks[4]);
}

fn render_header(f: &mut Frame, data: &FrameData, area: Rect) {
    let minutes = data.elapsed_secs / 60;
    let line = Line::from(vec![
        Span::styled(
            format!("{} {} ", data.underlying, data.expiration),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            Local::now().format("%I:%M:%S %p").to_string(),
            Style::default().fg(C_DIM),
        ),
        Span::styled(
            format!("  poi/coi={}", format_ratio(data.put_call_oi_ratio)),
            Style::default().fg(C_ACCENT),
        ),
        Span::styled(
            format!("  elapsed={}h{:02}m", minutes / 60, minutes % 60),
            Style::default().fg(C_DIM),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// One row per strike: put bar and value on the left, call bar and value on
/// the right, the strike label color-marked on unusual activity and the spot
/// row flagged with a marker.
fn render_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    series: &ChartSeries,
    data: &FrameData,
    precision: usize,
) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = data.strike_labels.len();
    let visible = visible_range(rows, data.signals.spot_index, inner.height as usize);
    let scale = chart_scale(series);
    let bar_width = (inner.width as usize).saturating_sub(28) / 2;

    let mut lines = Vec::new();
    for i in visible {
        let put = series.puts.get(i).copied().unwrap_or(0.0);
        let call = series.calls.get(i).copied().unwrap_or(0.0);
        let unusual_put = data.signals.unusual_puts.get(i).copied().unwrap_or(false);
        let unusual_call = data.signals.unusual_calls.get(i).copied().unwrap_or(false);

        let label_style = match (unusual_put, unusual_call) {
            (true, true) => Style::default().fg(C_WARN).add_modifier(Modifier::BOLD),
            (true, false) => Style::default().fg(C_PUT).add_modifier(Modifier::BOLD),
            (false, true) => Style::default().fg(C_CALL).add_modifier(Modifier::BOLD),
            (false, false) => Style::default().fg(C_DIM),
        };
        let marker = if i == data.signals.spot_index {
            "\u{25c0}"
        } else {
            " "
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{:>7}", data.strike_labels[i]), label_style),
            Span::styled(marker, Style::default().fg(C_BRIGHT)),
            Span::styled(
                format!("{:>9.precision$}", put, precision = precision),
                Style::default().fg(C_PUT),
            ),
            Span::styled(
                format!(" {} ", bar(put, scale, bar_width)),
                Style::default().fg(C_PUT),
            ),
            Span::styled(
                format!("{} ", bar(call, scale, bar_width)),
                Style::default().fg(C_CALL),
            ),
            Span::styled(
                format!("{:<9.precision$}", call, precision = precision),
                Style::default().fg(C_CALL),
            ),
        ]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_reports(f: &mut Frame, reports: &[WindowReport], area: Rect) {
    let block = Block::default()
        .title(" WINDOWED FLOW ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines: Vec<Line> = reports
        .iter()
        .map(|r| {
            let flow_color = if r.hedge_flow >= 0.0 { C_CALL } else { C_PUT };
            Line::from(vec![
                Span::styled(format!("{:<10}", r.label), Style::default().fg(C_BRIGHT)),
                Span::styled(
                    format!(" pv={:>7.0}", r.put_volume_delta),
                    Style::default().fg(C_PUT),
                ),
                Span::styled(
                    format!(" cv={:>7.0}", r.call_volume_delta),
                    Style::default().fg(C_CALL),
                ),
                Span::styled(
                    format!(" pv/cv={:>6}", format_ratio(r.volume_ratio)),
                    Style::default().fg(C_ACCENT),
                ),
                Span::styled(
                    format!(" \u{0394}p={:>6.0}", r.put_oi_delta),
                    Style::default().fg(C_PUT),
                ),
                Span::styled(
                    format!(" \u{0394}c={:>6.0}", r.call_oi_delta),
                    Style::default().fg(C_CALL),
                ),
                Span::styled(
                    format!(" \u{03b4}h={:>12.0}", r.hedge_flow),
                    Style::default().fg(flow_color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" vol={:>11.0}", r.underlying_volume_delta),
                    Style::default().fg(C_DIM),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_footer(f: &mut Frame, data: &FrameData, area: Rect) {
    let mut lines = Vec::new();

    if !data.missing_delta.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Delta incomplete: {}", data.missing_delta.join(" ")),
            Style::default().fg(C_WARN),
        )));
    }

    let status_color = match data.status {
        ConnectionStatus::Connected => C_CALL,
        ConnectionStatus::Failed => C_PUT,
        _ => C_WARN,
    };
    lines.push(Line::from(vec![
        Span::styled("Status: ", Style::default().fg(C_DIM)),
        Span::styled(
            data.status.label(),
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "  |  spot {:.2}  |  since {}  |  'q' to quit",
                data.signals.spot_price,
                data.session_start.format("%I:%M:%S %p"),
            ),
            Style::default().fg(C_DIM),
        ),
    ]));

    f.render_widget(Paragraph::new(lines), area);
}

/// Which strike rows fit: a window of `height` rows centered on the spot.
fn visible_range(rows: usize, spot_index: usize, height: usize) -> std::ops::Range<usize> {
    if rows <= height || height == 0 {
        return 0..rows;
    }
    let half = height / 2;
    let start = spot_index.saturating_sub(half).min(rows - height);
    start..start + height
}

/// Shared scale for both sides of a chart, never zero.
fn chart_scale(series: &ChartSeries) -> f64 {
    series
        .puts
        .iter()
        .chain(&series.calls)
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE)
}

/// Horizontal bar filled proportionally to `value / scale`. Negative values
/// render empty; the numeric column carries the sign.
fn bar(value: f64, scale: f64, width: usize) -> String {
    let filled = ((value.max(0.0) / scale) * width as f64).round() as usize;
    let filled = filled.min(width);
    let mut out = String::with_capacity(width * 3);
    for _ in 0..filled {
        out.push('\u{2588}');
    }
    for _ in filled..width {
        out.push('\u{2591}');
    }
    out
}

/// Ratio display that tolerates the unbounded/undefined values division by
/// zero produces.
pub fn format_ratio(ratio: f64) -> String {
    if ratio.is_nan() {
        "n/a".to_string()
    } else if ratio.is_infinite() {
        if ratio > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{ratio:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ratio_defensive() {
        assert_eq!(format_ratio(1.25), "1.250");
        assert_eq!(format_ratio(f64::INFINITY), "inf");
        assert_eq!(format_ratio(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_ratio(f64::NAN), "n/a");
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(5.0, 10.0, 10), "█████░░░░░");
        assert_eq!(bar(10.0, 10.0, 10), "██████████");
        // Negative values render empty, not panicking the scale
        assert_eq!(bar(-3.0, 10.0, 4), "░░░░");
        // Values above scale clamp to full
        assert_eq!(bar(20.0, 10.0, 4), "████");
    }

    #[test]
    fn test_visible_range_centers_on_spot() {
        // All rows fit
        assert_eq!(visible_range(5, 2, 10), 0..5);
        // Centered window
        assert_eq!(visible_range(100, 50, 11), 45..56);
        // Clamped at the edges
        assert_eq!(visible_range(100, 1, 11), 0..11);
        assert_eq!(visible_range(100, 99, 11), 89..100);
    }

    #[test]
    fn test_chart_scale_never_zero() {
        let empty = ChartSeries::default();
        assert!(chart_scale(&empty) > 0.0);

        let series = ChartSeries {
            puts: vec![0.5, -3.0],
            calls: vec![1.0],
        };
        assert_eq!(chart_scale(&series), 3.0);
    }
}
