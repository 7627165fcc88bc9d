// ============================================================================
// Écran Liste des positions
// ============================================================================

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::FundHolding;

/// Ligne affichée pour une position
fn holding_line(holding: &FundHolding) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {:<32}", holding.display_name()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("cost ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{:<12}", holding.cost_price_label())),
        Span::styled("shares ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{:<14}", holding.shares_label())),
        Span::styled("purchase ", Style::default().fg(Color::Gray)),
        Span::styled(holding.purchase_cost_label(), Style::default().fg(Color::Cyan)),
    ])
}

pub fn render_funds_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" My funds ({}) ", app.funds().len()));

    if app.funds().is_empty() {
        let text = if app.loading().is_some() {
            "Loading funds..."
        } else {
            "No funds yet, press [a] to add one"
        };
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(text, Style::default().fg(Color::Gray))),
        ])
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app.funds().iter().map(|h| ListItem::new(holding_line(h))).collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    state.select(Some(app.selected_fund_index()));
    frame.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_line_contents() {
        let holding = FundHolding {
            id: 1,
            fund_code: "110011".to_string(),
            fund_name: Some("Fund A".to_string()),
            cost_price: 1.2345,
            shares: 1000.0,
        };

        let text: String = holding_line(&holding)
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert!(text.contains("Fund A(110011)"));
        assert!(text.contains("¥1.2345"));
        assert!(text.ends_with("¥1234.50"));
    }
}
