// ============================================================================
// Écran de connexion
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, LoginField, LoginForm};
use crate::ui::dashboard::centered_rect;

pub fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let form = app.login();
    let area = centered_rect(50, 60, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Sign in ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    render_field(frame, "Username", &form.username, form.focus == LoginField::Username, chunks[0]);
    let masked = "*".repeat(form.password.chars().count());
    render_field(frame, "Password", &masked, form.focus == LoginField::Password, chunks[1]);
    frame.render_widget(Paragraph::new(remember_line(form)), chunks[2]);

    let status = if form.submitting {
        Line::from(Span::styled("Signing in...", Style::default().fg(Color::Gray)))
    } else if let Some(error) = form.error() {
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(status).alignment(Alignment::Center), chunks[3]);

    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let help = Paragraph::new(Line::from(vec![
        Span::styled("[Tab]", key),
        Span::raw(" Next  "),
        Span::styled("[Space]", key),
        Span::raw(" Toggle remember  "),
        Span::styled("[Enter]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(" Sign in  "),
        Span::styled("[Esc]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Quit"),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(help, chunks[4]);
}

fn render_field(frame: &mut Frame, label: &str, value: &str, focused: bool, area: Rect) {
    let border = if focused { Color::Green } else { Color::DarkGray };
    let cursor = if focused { "█" } else { "" };

    let paragraph = Paragraph::new(Line::from(vec![Span::raw(value.to_string()), Span::raw(cursor)])).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" {} ", label)),
    );
    frame.render_widget(paragraph, area);
}

fn remember_line(form: &LoginForm) -> Line<'static> {
    let mark = if form.remember { "[x]" } else { "[ ]" };
    let style = if form.focus == LoginField::Remember {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(Span::styled(format!(" {} Remember me", mark), style))
}
