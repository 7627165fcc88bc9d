// ============================================================================
// Modal de tendance : deux graphiques + tableau des valeurs
// ============================================================================
// Le graphique vivant est lu dans ChartHost (jamais reconstruit ici).
//
// CONCEPTS RATATUI :
// 1. Chart + Dataset : séries (x, y) reliées par des lignes
// 2. Axis : bornes et labels ; un axe Y par panneau
// 3. Clear : efface la zone avant de dessiner le modal
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, ChartModal};
use crate::chart::TrendChart;
use crate::error::ClientError;
use crate::ui::dashboard::centered_rect;
use crate::ui::portfolio::profit_style;

/// En dessous, les deux panneaux ne sont pas lisibles
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 16;

pub fn render_chart_modal(frame: &mut Frame, app: &App, modal: &ChartModal) {
    let area = centered_rect(90, 90, frame.size());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ({}) ", modal.fund_name, modal.fund_code))
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = &modal.error {
        render_fallback(frame, inner, error);
        return;
    }

    let Some(chart) = app.charts().live() else {
        render_fallback(frame, inner, &ClientError::Render("chart is no longer available".to_string()).to_string());
        return;
    };

    if inner.width < MIN_WIDTH || inner.height < MIN_HEIGHT {
        render_fallback(frame, inner, &ClientError::Render("terminal too small".to_string()).to_string());
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(inner);

    render_nav_panel(frame, chart, chunks[0]);
    render_growth_panel(frame, chart, chunks[1]);
    render_rows(frame, chart, chunks[2]);

    let help = Paragraph::new(Line::from(vec![
        Span::styled("[Esc]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Close"),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(help, chunks[3]);
}

/// Labels de dates : premier, milieu, dernier
fn date_labels(chart: &TrendChart) -> Vec<Span<'static>> {
    let dates = &chart.series.dates;
    let pick = |i: usize| Span::raw(dates.get(i).cloned().unwrap_or_default());
    match dates.len() {
        0 => Vec::new(),
        1 => vec![pick(0)],
        n => vec![pick(0), pick(n / 2), pick(n - 1)],
    }
}

fn value_labels(bounds: [f64; 2], format: impl Fn(f64) -> String) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    vec![
        Span::raw(format(bounds[0])),
        Span::raw(format(mid)),
        Span::raw(format(bounds[1])),
    ]
}

fn render_nav_panel(frame: &mut Frame, chart: &TrendChart, area: Rect) {
    let datasets = vec![Dataset::default()
        .name("Unit NAV")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&chart.nav_points)];

    let widget = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", chart.title())))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.x_bounds())
                .labels(date_labels(chart)),
        )
        .y_axis(
            Axis::default()
                .title("NAV")
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.nav_bounds)
                .labels(value_labels(chart.nav_bounds, |v| format!("{:.4}", v))),
        );
    frame.render_widget(widget, area);
}

fn render_growth_panel(frame: &mut Frame, chart: &TrendChart, area: Rect) {
    // Zéro visible : gain au-dessus, perte en dessous
    let last_growth = chart.series.growth.last().copied().unwrap_or(0.0);

    let datasets = vec![Dataset::default()
        .name("Daily growth")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(profit_style(last_growth >= 0.0))
        .data(&chart.growth_points)];

    let widget = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(" Daily growth "))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.x_bounds())
                .labels(date_labels(chart)),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .style(Style::default().fg(Color::Gray))
                .bounds(chart.growth_bounds)
                .labels(value_labels(chart.growth_bounds, |v| format!("{:.2}%", v))),
        );
    frame.render_widget(widget, area);
}

/// Valeurs brutes, du plus récent au plus ancien
fn render_rows(frame: &mut Frame, chart: &TrendChart, area: Rect) {
    let header = Row::new(vec!["Date", "Unit NAV", "Daily growth"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = chart
        .rows
        .iter()
        .map(|change| {
            Row::new(vec![
                Cell::from(change.date.clone()),
                Cell::from(format!("{:.4}", change.unit_nav)),
                Cell::from(Span::styled(
                    change.daily_growth.clone(),
                    profit_style(change.daily_growth_value >= 0.0),
                )),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(12), Constraint::Length(10), Constraint::Length(14)])
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(" Recent changes "));
    frame.render_widget(table, area);
}

/// Texte de repli quand le graphique ne peut pas être dessiné
fn render_fallback(frame: &mut Frame, area: Rect, message: &str) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled("[Esc] Close", Style::default().fg(Color::Gray))),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecentChange;

    fn chart_with(dates: &[&str]) -> TrendChart {
        let changes: Vec<RecentChange> = dates
            .iter()
            .map(|d| RecentChange {
                date: d.to_string(),
                unit_nav: 1.0,
                daily_growth: "0.00%".to_string(),
                daily_growth_value: 0.0,
            })
            .collect();
        TrendChart::build(1, "x", "X", &changes).unwrap()
    }

    #[test]
    fn test_date_labels_are_chronological() {
        let chart = chart_with(&["2024-03-07", "2024-03-06", "2024-03-05"]);
        let labels: Vec<String> = date_labels(&chart).iter().map(|s| s.content.to_string()).collect();
        assert_eq!(labels, vec!["2024-03-05", "2024-03-06", "2024-03-07"]);

        let single = chart_with(&["2024-03-07"]);
        assert_eq!(date_labels(&single).len(), 1);
    }

    #[test]
    fn test_value_labels_precision() {
        let labels: Vec<String> = value_labels([1.0, 2.0], |v| format!("{:.4}", v))
            .iter()
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(labels, vec!["1.0000", "1.5000", "2.0000"]);
    }
}
