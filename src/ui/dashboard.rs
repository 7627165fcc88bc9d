// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Routeur de rendu : header, écran courant, ligne de statut, footer,
// puis les modals par-dessus.
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones
// 3. Clear : efface une zone avant d'y dessiner un modal
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, MessageKind, Screen};
use crate::ui::{chart, funds, login, modal, portfolio};

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Écran courant
            Constraint::Length(1), // Message / chargement
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    render_header(frame, app, chunks[0]);

    match app.screen() {
        Screen::Login => login::render_login(frame, app, chunks[1]),
        Screen::Portfolio => portfolio::render_portfolio(frame, app, chunks[1]),
        Screen::FundsList => funds::render_funds_list(frame, app, chunks[1]),
    }

    render_status_line(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    // Les modals ont chacun leur slot ; le graphe passe au-dessus
    if let Some(form) = app.form() {
        modal::render_form_modal(frame, app, form);
    }
    if let Some(chart_modal) = app.chart_modal() {
        chart::render_chart_modal(frame, app, chart_modal);
    }
}

/// Rect centré occupant un pourcentage de `area`
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Fundfolio ")
        .title_alignment(Alignment::Center);

    let text = match app.username() {
        Some(username) => Line::from(Span::styled(
            format!("Welcome, {}", username),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled("Personal fund portfolio", Style::default().fg(Color::Gray))),
    };

    frame.render_widget(Paragraph::new(text).block(block).alignment(Alignment::Center), area);
}

/// Message transitoire en priorité, sinon indicateur de chargement
fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(message) = app.message() {
        let color = match message.kind {
            MessageKind::Info => Color::Cyan,
            MessageKind::Success => Color::Green,
            MessageKind::Error => Color::Red,
        };
        Line::from(Span::styled(message.text.clone(), Style::default().fg(color)))
    } else if let Some(loading) = app.loading() {
        Line::from(Span::styled(loading.to_string(), Style::default().fg(Color::Gray)))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn shortcut(key: &'static str, label: &'static str, color: Color) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(label),
    ]
}

/// Confirmation en deux temps : "appuyez à nouveau sur [key]"
fn confirmation_line(key: &'static str, action: String) -> Line<'static> {
    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("⚠  Press ", warning),
        Span::styled(
            key,
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(format!(" again to {}, any other key to cancel ⚠", action), warning),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let line = if app.is_awaiting_delete_confirmation() {
        let name = app
            .funds()
            .get(app.selected_fund_index())
            .map(|h| h.display_name())
            .unwrap_or_else(|| "?".to_string());
        confirmation_line("[d]", format!("delete {}", name))
    } else if app.is_awaiting_quit_confirmation() {
        confirmation_line("[q]", "quit".to_string())
    } else {
        let spans: Vec<Span> = match app.screen() {
            Screen::Login => Vec::new(),
            Screen::Portfolio => [
                shortcut("[q]", " Quit  ", Color::Yellow),
                shortcut("[↑↓]", " Select  ", Color::Yellow),
                shortcut("[Enter/t]", " Trend  ", Color::Yellow),
                shortcut("[r]", " Refresh  ", Color::Yellow),
                shortcut("[f]", " Funds  ", Color::Yellow),
                shortcut("[a]", " Add  ", Color::Green),
                shortcut("[o]", " Logout", Color::Red),
            ]
            .into_iter()
            .flatten()
            .collect(),
            Screen::FundsList => [
                shortcut("[q]", " Quit  ", Color::Yellow),
                shortcut("[↑↓]", " Select  ", Color::Yellow),
                shortcut("[a]", " Add  ", Color::Green),
                shortcut("[e]", " Edit  ", Color::Yellow),
                shortcut("[d]", " Delete  ", Color::Red),
                shortcut("[Esc/b]", " Back", Color::Yellow),
            ]
            .into_iter()
            .flatten()
            .collect(),
        };
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Center), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(60, 40, area);

        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 20);
        assert_eq!(rect.y, 15);
    }
}
