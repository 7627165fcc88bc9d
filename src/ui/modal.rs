// ============================================================================
// Modal "normal" : formulaire d'ajout / d'édition de fonds
// ============================================================================
// Dessiné par-dessus l'écran courant (Clear + Block).
// En mode ajout, la liste déroulante de recherche suit le statut de FundSearch.
// ============================================================================

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{App, FormField, FormMode, FundForm};
use crate::models::SearchSource;
use crate::search::{FundSearch, SearchStatus};
use crate::ui::dashboard::centered_rect;

pub fn render_form_modal(frame: &mut Frame, app: &App, form: &FundForm) {
    let area = centered_rect(70, 70, frame.size());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(format!(" {} ", form.title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &form.mode {
        FormMode::Add => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(1),
                ])
                .split(inner);

            render_input(frame, "Search fund (name or code)", &form.search_input, form.focus == FormField::Search, chunks[0]);
            render_dropdown(frame, app, chunks[1]);
            render_input(frame, "Cost price", &form.cost_price, form.focus == FormField::CostPrice, chunks[2]);
            render_input(frame, "Shares", &form.shares, form.focus == FormField::Shares, chunks[3]);
            render_help(frame, chunks[4]);
        }
        FormMode::Edit { display_name, .. } => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(1),
                ])
                .split(inner);

            let fund = Paragraph::new(Span::styled(
                display_name.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ))
            .block(Block::default().borders(Borders::ALL).title(" Fund "));
            frame.render_widget(fund, chunks[0]);

            render_input(frame, "Cost price", &form.cost_price, form.focus == FormField::CostPrice, chunks[1]);
            render_input(frame, "Shares", &form.shares, form.focus == FormField::Shares, chunks[2]);
            render_help(frame, chunks[4]);
        }
    }
}

/// Champ de saisie avec curseur quand il a le focus
fn render_input(frame: &mut Frame, label: &str, value: &str, focused: bool, area: Rect) {
    let border = if focused { Color::Green } else { Color::DarkGray };

    let mut spans = vec![Span::styled(value.to_string(), Style::default().fg(Color::White))];
    if focused {
        spans.push(Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" {} ", label)),
    );
    frame.render_widget(input, area);
}

/// Texte d'état de la liste déroulante (None = afficher les résultats)
pub(crate) fn dropdown_status(search: &FundSearch, selected: Option<(&str, &str)>) -> Option<(String, Color)> {
    match search.status() {
        SearchStatus::Loading => Some(("Searching...".to_string(), Color::Gray)),
        SearchStatus::Empty => Some(("No matching funds".to_string(), Color::Gray)),
        SearchStatus::Failed(message) => Some((message.clone(), Color::Red)),
        SearchStatus::Results => None,
        SearchStatus::Idle if search.has_pending() => Some(("Searching...".to_string(), Color::Gray)),
        SearchStatus::Idle => Some(match selected {
            Some((name, code)) => (format!("Selected: {} ({})", name, code), Color::Green),
            None => ("Type at least 2 characters to search".to_string(), Color::DarkGray),
        }),
    }
}

fn render_dropdown(frame: &mut Frame, app: &App, area: Rect) {
    let search = app.search();
    let selected = app.selected_fund().map(|s| (s.fund_name.as_str(), s.fund_code.as_str()));

    let mut title = " Results ".to_string();
    if search.source() == SearchSource::LocalFallback && !search.results().is_empty() {
        title = " Results (offline list) ".to_string();
    }
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some((text, color)) = dropdown_status(search, selected) {
        let paragraph = Paragraph::new(Span::styled(text, Style::default().fg(color))).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = search
        .results()
        .iter()
        .map(|result| {
            let mut spans = vec![
                Span::styled(format!("{:<8}", result.fund_code), Style::default().fg(Color::Cyan)),
                Span::raw(result.fund_name.clone()),
            ];
            if let Some(kind) = &result.fund_type {
                spans.push(Span::styled(format!("  {}", kind), Style::default().fg(Color::DarkGray)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(search.highlighted_index()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let help = Line::from(vec![
        Span::styled("[Tab]", key),
        Span::raw(" Next field  "),
        Span::styled("[↑↓]", key),
        Span::raw(" Pick result  "),
        Span::styled("[Enter]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(" Select / Save  "),
        Span::styled("[Esc]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Cancel"),
    ]);
    frame.render_widget(Paragraph::new(help), area);
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_dropdown_status_texts() {
        let mut search = FundSearch::new(Duration::from_millis(300));
        let now = Instant::now();

        let idle = dropdown_status(&search, None).unwrap();
        assert_eq!(idle.0, "Type at least 2 characters to search");
        let picked = dropdown_status(&search, Some(("Fund A", "110011"))).unwrap();
        assert_eq!(picked.0, "Selected: Fund A (110011)");

        search.on_input("fu", now);
        assert_eq!(dropdown_status(&search, None).unwrap().0, "Searching...");

        let ticket = search.poll(now + Duration::from_millis(300)).unwrap();
        search.apply(ticket.token, Ok((Vec::new(), SearchSource::Remote)));
        assert_eq!(dropdown_status(&search, None).unwrap().0, "No matching funds");

        search.on_input("fun", now);
        let ticket = search.poll(now + Duration::from_millis(300)).unwrap();
        search.apply(ticket.token, Err(ClientError::validation("Search failed, please try again later")));
        let (text, color) = dropdown_status(&search, None).unwrap();
        assert_eq!(text, "Search failed, please try again later");
        assert_eq!(color, Color::Red);
    }
}
