// ============================================================================
// Écran Portefeuille : résumé + tableau détaillé
// ============================================================================
// Deux étapes :
// 1. SummaryView::build() : résumé -> textes formatés + signes (pur, testé)
// 2. render_portfolio() : dessine la vue avec ratatui
//
// Convention de couleurs : gain = vert, perte = rouge
// ============================================================================

use rand::seq::SliceRandom;
use rand::Rng;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::models::summary::{FundDetail, PortfolioSummary};

/// Légendes quand le gain du jour est positif ou nul
pub const POSITIVE_CAPTIONS: [&str; 5] = [
    "Fortune smiles on you!",
    "Thought it would drop, but it went up!",
    "A small win, full of energy today!",
    "With my luck, whatever I buy goes up, hahaha!",
    "A small win today, a big win tomorrow!",
];

/// Légendes quand le gain du jour est négatif
pub const NEGATIVE_CAPTIONS: [&str; 6] = [
    "Whatever I buy goes down. I am the market's contrarian indicator.",
    "Lost money?! Yes, the thing that was supposed to be rock steady lost money.",
    "Checking my funds feels like a roller coaster, free-fall edition.",
    "Down again? All I asked was to beat my savings account a little.",
    "A loss? Let's laugh it off together!",
    "A small loss now, big gains later!",
];

/// Tire une légende dans le groupe correspondant au signe du jour
pub fn pick_caption<R: Rng + ?Sized>(today_positive: bool, rng: &mut R) -> &'static str {
    let bucket: &[&'static str] = if today_positive {
        &POSITIVE_CAPTIONS
    } else {
        &NEGATIVE_CAPTIONS
    };
    bucket.choose(rng).copied().unwrap_or_default()
}

pub(crate) fn profit_style(positive: bool) -> Style {
    if positive {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

// ============================================================================
// Vue formatée
// ============================================================================

/// Une ligne du tableau détaillé
#[derive(Debug, Clone, PartialEq)]
pub struct FundRow {
    pub code: String,
    pub name: String,
    pub purchase_amount: String,
    pub cost_price: String,
    /// "VL veille/estimation"
    pub nav: String,
    pub is_up: bool,
    pub change_rate: String,
    pub change_negative: bool,
    pub today_revenue: String,
    pub today_positive: bool,
    pub total_revenue: String,
    pub total_positive: bool,
    pub profit_loss_ratio: String,
    pub ratio_positive: bool,
    pub has_trend: bool,
}

impl FundRow {
    pub fn from_detail(fund: &FundDetail) -> Self {
        Self {
            code: or_dash(&fund.fund_code),
            name: or_dash(&fund.fund_name),
            purchase_amount: format!("¥{:.2}", fund.cost),
            cost_price: format!("{:.4}", fund.cost_price),
            nav: format!("{:.4}/{:.4}", fund.previous_nav, fund.today_value),
            is_up: fund.is_up_from_previous_nav(),
            change_rate: fund.change_rate_label().to_string(),
            change_negative: fund.is_change_negative(),
            today_revenue: format!("¥{:.2}", fund.today_revenue),
            today_positive: fund.today_revenue >= 0.0,
            total_revenue: format!("¥{:.2}", fund.total_revenue),
            total_positive: fund.total_revenue >= 0.0,
            profit_loss_ratio: format!("{:.2}%", fund.profit_loss_ratio),
            ratio_positive: fund.profit_loss_ratio >= 0.0,
            has_trend: fund.has_trend_data(),
        }
    }
}

fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Résumé prêt à afficher
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryView {
    pub total_cost: String,
    pub total_revenue: String,
    pub total_positive: bool,
    pub today_revenue: String,
    pub today_positive: bool,
    pub caption: String,
    pub low_funds: Vec<String>,
    pub high_funds: Vec<String>,
    pub fund_count: usize,
    pub rows: Vec<FundRow>,
}

impl SummaryView {
    pub fn build(summary: &PortfolioSummary, caption: &str) -> Self {
        Self {
            total_cost: format!("¥{:.2}", summary.total_cost),
            total_revenue: format!("¥{:.2}", summary.total_revenue()),
            total_positive: summary.is_total_positive(),
            today_revenue: format!("¥{:.2}", summary.today_revenue),
            today_positive: summary.is_today_positive(),
            caption: caption.to_string(),
            low_funds: summary.low_fund_list.clone(),
            high_funds: summary.high_fund_list.clone(),
            fund_count: summary.displayed_fund_count(),
            rows: summary.fund_details.iter().map(FundRow::from_detail).collect(),
        }
    }

    pub fn has_valuation_lists(&self) -> bool {
        !self.low_funds.is_empty() || !self.high_funds.is_empty()
    }
}

// ============================================================================
// Rendu
// ============================================================================

pub fn render_portfolio(frame: &mut Frame, app: &App, area: Rect) {
    let Some(summary) = app.summary() else {
        let text = if app.loading().is_some() {
            "Loading portfolio..."
        } else {
            "No portfolio data, press [r] to refresh"
        };
        let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(text, Style::default().fg(Color::Gray)))])
            .block(Block::default().borders(Borders::ALL).title(" Portfolio "))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    };

    let view = SummaryView::build(summary, app.caption());

    let mut constraints = vec![Constraint::Length(4)];
    if view.has_valuation_lists() {
        constraints.push(Constraint::Length(4));
    }
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_summary_block(frame, &view, chunks[0]);
    if view.has_valuation_lists() {
        render_valuation_lists(frame, &view, chunks[1]);
    }
    render_fund_table(frame, &view, app.selected_row(), chunks[chunks.len() - 1]);
}

fn render_summary_block(frame: &mut Frame, view: &SummaryView, area: Rect) {
    let label = Style::default().fg(Color::Gray);
    let bold = Modifier::BOLD;

    let figures = Line::from(vec![
        Span::styled("Total cost ", label),
        Span::styled(view.total_cost.clone(), Style::default().add_modifier(bold)),
        Span::raw("    "),
        Span::styled("Total revenue ", label),
        Span::styled(view.total_revenue.clone(), profit_style(view.total_positive).add_modifier(bold)),
        Span::raw("    "),
        Span::styled("Today ", label),
        Span::styled(view.today_revenue.clone(), profit_style(view.today_positive).add_modifier(bold)),
    ]);
    let caption = Line::from(Span::styled(
        view.caption.clone(),
        profit_style(view.today_positive).add_modifier(Modifier::ITALIC),
    ));

    let paragraph = Paragraph::new(vec![figures, caption])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Summary "),
        )
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_valuation_lists(frame: &mut Frame, view: &SummaryView, area: Rect) {
    let mut lines = Vec::new();
    if !view.low_funds.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Down more than 3%: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(view.low_funds.join("  ")),
        ]));
    }
    if !view.high_funds.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Up more than 3%: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(view.high_funds.join("  ")),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Valuation "));
    frame.render_widget(paragraph, area);
}

fn render_fund_table(frame: &mut Frame, view: &SummaryView, selected: usize, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Fund details ({} funds) ", view.fund_count));

    if view.rows.is_empty() {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No fund detail data", Style::default().fg(Color::Gray))),
        ])
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec![
        "Code",
        "Name",
        "Purchase",
        "Cost",
        "Prev/Today",
        "Change",
        "Today",
        "Total",
        "P/L",
        "Trend",
    ])
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = view
        .rows
        .iter()
        .map(|row| {
            let arrow = if row.is_up { "↑" } else { "↓" };
            let trend = if row.has_trend {
                Cell::from(Span::styled("[t] view", Style::default().fg(Color::Cyan)))
            } else {
                Cell::from(Span::styled("no data", Style::default().fg(Color::DarkGray)))
            };

            Row::new(vec![
                Cell::from(row.code.clone()),
                Cell::from(row.name.clone()),
                Cell::from(row.purchase_amount.clone()),
                Cell::from(row.cost_price.clone()),
                Cell::from(Line::from(vec![
                    Span::raw(format!("{} ", row.nav)),
                    Span::styled(arrow, profit_style(row.is_up)),
                ])),
                Cell::from(Span::styled(row.change_rate.clone(), profit_style(!row.change_negative))),
                Cell::from(Span::styled(row.today_revenue.clone(), profit_style(row.today_positive))),
                Cell::from(Span::styled(row.total_revenue.clone(), profit_style(row.total_positive))),
                Cell::from(Span::styled(row.profit_loss_ratio.clone(), profit_style(row.ratio_positive))),
                trend,
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(8),
        Constraint::Min(16),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(18),
        Constraint::Length(8),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(8),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(table, area, &mut state);
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::RecentChange;

    #[test]
    fn test_pick_caption_follows_sign() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert!(POSITIVE_CAPTIONS.contains(&pick_caption(true, &mut rng)));
            assert!(NEGATIVE_CAPTIONS.contains(&pick_caption(false, &mut rng)));
        }
    }

    #[test]
    fn test_row_arrow_and_change_colour() {
        let fund = FundDetail {
            fund_code: "110011".to_string(),
            fund_name: "Fund A".to_string(),
            cost: 1234.5,
            cost_price: 1.2345,
            previous_nav: 1.5,
            today_value: 1.4,
            change_rate: "-6.67%".to_string(),
            today_revenue: -100.0,
            total_revenue: 50.0,
            profit_loss_ratio: 4.05,
            ..FundDetail::default()
        };
        let row = FundRow::from_detail(&fund);

        assert!(!row.is_up);
        assert!(row.change_negative);
        assert_eq!(row.nav, "1.5000/1.4000");
        assert_eq!(row.cost_price, "1.2345");
        assert_eq!(row.purchase_amount, "¥1234.50");
        assert!(!row.today_positive);
        assert!(row.total_positive);
        assert_eq!(row.profit_loss_ratio, "4.05%");
        assert!(!row.has_trend);
    }

    #[test]
    fn test_missing_fields_render_as_dash_and_zero() {
        let row = FundRow::from_detail(&FundDetail::default());
        assert_eq!(row.code, "-");
        assert_eq!(row.name, "-");
        assert_eq!(row.change_rate, "0.00%");
        assert_eq!(row.today_revenue, "¥0.00");
        // 0 == 0 : pas de hausse
        assert!(!row.is_up);
    }

    #[test]
    fn test_summary_view_totals() {
        let summary = PortfolioSummary {
            total_cost: 2000.0,
            today_revenue: -5.0,
            high_fund_list: vec!["161725".to_string()],
            fund_details: vec![
                FundDetail {
                    total_revenue: 30.0,
                    recent_changes: vec![RecentChange {
                        date: "2024-03-05".to_string(),
                        unit_nav: 1.0,
                        daily_growth: "0.1%".to_string(),
                        daily_growth_value: 0.1,
                    }],
                    ..FundDetail::default()
                },
                FundDetail {
                    total_revenue: -40.0,
                    ..FundDetail::default()
                },
            ],
            ..PortfolioSummary::default()
        };

        let view = SummaryView::build(&summary, NEGATIVE_CAPTIONS[0]);
        assert_eq!(view.total_cost, "¥2000.00");
        assert_eq!(view.total_revenue, "¥-10.00");
        assert!(!view.total_positive);
        assert!(!view.today_positive);
        assert_eq!(view.fund_count, 2);
        assert!(view.has_valuation_lists());
        assert!(view.rows[0].has_trend);
    }
}
