// ============================================================================
// Graphique de tendance : adaptation des données + cycle de vie
// ============================================================================
// Le backend livre recent_changes du plus récent au plus ancien.
// Le graphique veut l'ordre chronologique : on inverse, puis on construit
// deux séries alignées sur le même axe des dates :
//   - valeur liquidative (axe Y gauche, 4 décimales)
//   - croissance journalière en % (axe Y droit, 2 décimales)
//
// ChartHost garde au plus UNE instance vivante : l'ancienne est toujours
// détruite avant d'en créer une nouvelle.
// ============================================================================

use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::models::RecentChange;

/// Séries en ordre chronologique (du plus ancien au plus récent)
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub dates: Vec<String>,
    pub nav: Vec<f64>,
    pub growth: Vec<f64>,
}

impl TrendSeries {
    /// Inverse exactement l'ordre reçu
    pub fn from_recent_changes(changes: &[RecentChange]) -> Self {
        let chronological = changes.iter().rev();

        let mut series = Self {
            dates: Vec::with_capacity(changes.len()),
            nav: Vec::with_capacity(changes.len()),
            growth: Vec::with_capacity(changes.len()),
        };
        for change in chronological {
            series.dates.push(change.date.clone());
            series.nav.push(change.unit_nav);
            series.growth.push(change.daily_growth_value);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Une instance de graphique prête à être dessinée
#[derive(Debug, Clone, PartialEq)]
pub struct TrendChart {
    pub id: u64,
    pub fund_code: String,
    pub fund_name: String,
    pub series: TrendSeries,
    /// Points (x = index du jour, y = VL)
    pub nav_points: Vec<(f64, f64)>,
    /// Points (x = index du jour, y = croissance %)
    pub growth_points: Vec<(f64, f64)>,
    pub nav_bounds: [f64; 2],
    pub growth_bounds: [f64; 2],
    /// Lignes brutes, du plus récent au plus ancien (tableau sous le graphe)
    pub rows: Vec<RecentChange>,
}

impl TrendChart {
    /// Construit le graphique ; échoue si les données sont inexploitables
    pub fn build(id: u64, fund_code: &str, fund_name: &str, changes: &[RecentChange]) -> ClientResult<Self> {
        if changes.is_empty() {
            return Err(ClientError::Render("no trend data".to_string()));
        }

        let series = TrendSeries::from_recent_changes(changes);
        if let Some(bad) = series
            .nav
            .iter()
            .chain(series.growth.iter())
            .find(|v| !v.is_finite())
        {
            return Err(ClientError::Render(format!("invalid value {}", bad)));
        }

        let nav_points = to_points(&series.nav);
        let growth_points = to_points(&series.growth);

        Ok(Self {
            id,
            fund_code: fund_code.to_string(),
            fund_name: fund_name.to_string(),
            nav_bounds: padded_bounds(&series.nav),
            growth_bounds: padded_bounds(&series.growth),
            nav_points,
            growth_points,
            series,
            rows: changes.to_vec(),
        })
    }

    /// Borne X commune aux deux séries
    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, self.series.len().saturating_sub(1).max(1) as f64]
    }

    pub fn title(&self) -> String {
        format!("{} ({}) NAV trend", self.fund_name, self.fund_code)
    }
}

fn to_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect()
}

/// Min/max avec 5% de marge ; une série plate reçoit une marge minimale
fn padded_bounds(values: &[f64]) -> [f64; 2] {
    let (min, max) = values
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), &v| (min.min(v), max.max(v)));

    let margin = if (max - min).abs() < f64::EPSILON {
        (max.abs() * 0.01).max(0.01)
    } else {
        (max - min) * 0.05
    };

    [min - margin, max + margin]
}

// ============================================================================
// ChartHost : une seule instance vivante
// ============================================================================

/// Propriétaire de l'instance de graphique courante
#[derive(Debug, Default)]
pub struct ChartHost {
    live: Option<TrendChart>,
    next_id: u64,
    created: u64,
    disposed: u64,
}

impl ChartHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Détruit l'instance courante puis en crée une nouvelle
    ///
    /// En cas d'échec de construction, aucune instance ne reste vivante.
    pub fn open(&mut self, fund_code: &str, fund_name: &str, changes: &[RecentChange]) -> ClientResult<&TrendChart> {
        self.dispose();

        self.next_id += 1;
        match TrendChart::build(self.next_id, fund_code, fund_name, changes) {
            Ok(chart) => {
                self.created += 1;
                debug!(id = chart.id, fund = %fund_code, points = chart.series.len(), "Trend chart created");
                Ok(self.live.insert(chart))
            }
            Err(e) => {
                warn!(fund = %fund_code, error = %e, "Trend chart build failed");
                Err(e)
            }
        }
    }

    /// Détruit l'instance courante s'il y en a une
    pub fn dispose(&mut self) {
        if let Some(chart) = self.live.take() {
            self.disposed += 1;
            debug!(id = chart.id, "Trend chart disposed");
        }
    }

    pub fn live(&self) -> Option<&TrendChart> {
        self.live.as_ref()
    }

    /// Instances créées et pas encore détruites
    pub fn live_count(&self) -> u64 {
        self.created - self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(date: &str, nav: f64, growth: f64) -> RecentChange {
        RecentChange {
            date: date.to_string(),
            unit_nav: nav,
            daily_growth: format!("{:.2}%", growth),
            daily_growth_value: growth,
        }
    }

    fn newest_first() -> Vec<RecentChange> {
        vec![
            change("2024-03-07", 1.30, 0.77),
            change("2024-03-06", 1.29, -0.15),
            change("2024-03-05", 1.292, 1.10),
        ]
    }

    #[test]
    fn test_series_is_exact_reversal() {
        let changes = newest_first();
        let series = TrendSeries::from_recent_changes(&changes);

        assert_eq!(series.dates, vec!["2024-03-05", "2024-03-06", "2024-03-07"]);
        assert_eq!(series.nav, vec![1.292, 1.29, 1.30]);
        assert_eq!(series.growth, vec![1.10, -0.15, 0.77]);
    }

    #[test]
    fn test_build_points_and_bounds() {
        let chart = TrendChart::build(1, "110011", "Fund A", &newest_first()).unwrap();

        assert_eq!(chart.nav_points[0], (0.0, 1.292));
        assert_eq!(chart.growth_points[2], (2.0, 0.77));
        assert!(chart.nav_bounds[0] < 1.29 && chart.nav_bounds[1] > 1.30);
        assert!(chart.growth_bounds[0] < -0.15 && chart.growth_bounds[1] > 1.10);
        assert_eq!(chart.x_bounds(), [0.0, 2.0]);
        // Le tableau garde l'ordre du backend
        assert_eq!(chart.rows[0].date, "2024-03-07");
    }

    #[test]
    fn test_flat_series_has_non_empty_bounds() {
        let changes = vec![change("2024-03-05", 1.0, 0.0)];
        let chart = TrendChart::build(1, "x", "x", &changes).unwrap();
        assert!(chart.nav_bounds[0] < chart.nav_bounds[1]);
        assert!(chart.growth_bounds[0] < chart.growth_bounds[1]);
    }

    #[test]
    fn test_invalid_data_is_render_error() {
        let changes = vec![change("2024-03-05", f64::NAN, 0.0)];
        assert!(matches!(
            TrendChart::build(1, "x", "x", &changes),
            Err(ClientError::Render(_))
        ));
        assert!(TrendChart::build(1, "x", "x", &[]).is_err());
    }

    #[test]
    fn test_opening_twice_leaves_one_live_instance() {
        let mut host = ChartHost::new();

        let first = host.open("110011", "Fund A", &newest_first()).unwrap().id;
        let second = host.open("110011", "Fund A", &newest_first()).unwrap().id;

        assert_ne!(first, second);
        assert_eq!(host.live_count(), 1);
        assert_eq!(host.live().unwrap().id, second);

        host.dispose();
        assert_eq!(host.live_count(), 0);
        assert!(host.live().is_none());
    }

    #[test]
    fn test_failed_open_disposes_previous() {
        let mut host = ChartHost::new();
        host.open("a", "A", &newest_first()).unwrap();

        assert!(host.open("b", "B", &[]).is_err());
        assert_eq!(host.live_count(), 0);
    }
}
