// ============================================================================
// Structure : PortfolioSummary
// ============================================================================
// Agrégat calculé par le backend (GET /api/funds/calculate)
//
// Le backend peut omettre des champs ou envoyer null : tout est défaut
// à zéro / vide pour que le rendu ne casse jamais.
//
// CONCEPT RUST : deserialize_with
// - #[serde(default)] gère l'absence du champ
// - null_as_default gère la présence explicite de `null`
// ============================================================================

use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Variation journalière d'un fonds (une ligne de l'historique récent)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecentChange {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unit_nav: f64,
    /// Version texte, ex: "-0.85%"
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_growth: String,
    /// Version numérique en pourcentage, ex: -0.85
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_growth_value: f64,
}

/// Détail d'un fonds dans le résumé
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FundDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub fund_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub fund_name: String,
    /// Montant d'achat (prix de revient × parts)
    #[serde(deserialize_with = "null_as_default")]
    pub cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost_price: f64,
    /// Valeur liquidative de la veille
    #[serde(rename = "shangrijingzhi", deserialize_with = "null_as_default")]
    pub previous_nav: f64,
    /// Estimation du jour
    #[serde(deserialize_with = "null_as_default")]
    pub today_value: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub change_rate: String,
    #[serde(deserialize_with = "null_as_default")]
    pub today_revenue: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_revenue: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub profit_loss_ratio: f64,
    /// Du plus récent au plus ancien
    #[serde(deserialize_with = "lenient_changes")]
    pub recent_changes: Vec<RecentChange>,
}

impl FundDetail {
    pub fn has_trend_data(&self) -> bool {
        !self.recent_changes.is_empty()
    }

    /// "0.00%" quand le backend n'a pas de taux
    pub fn change_rate_label(&self) -> &str {
        if self.change_rate.is_empty() {
            "0.00%"
        } else {
            &self.change_rate
        }
    }

    /// Le taux texte contient un signe moins
    pub fn is_change_negative(&self) -> bool {
        self.change_rate.contains('-')
    }

    /// Estimation du jour strictement au-dessus de la VL de la veille
    pub fn is_up_from_previous_nav(&self) -> bool {
        self.today_value > self.previous_nav
    }
}

/// Résumé complet du portefeuille
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PortfolioSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub fund_count: usize,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub yesterday_holding_amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub yesterday_holding_income: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub today_revenue: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub today_holding_amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub low_fund_list: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub high_fund_list: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub fund_details: Vec<FundDetail>,
}

impl PortfolioSummary {
    /// Résumé vide (affiché quand le backend répond 404 "No funds found")
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gain total = somme des gains totaux de chaque fonds
    pub fn total_revenue(&self) -> f64 {
        self.fund_details.iter().map(|f| f.total_revenue).sum()
    }

    /// fund_count si le backend l'envoie, sinon le nombre de lignes
    pub fn displayed_fund_count(&self) -> usize {
        if self.fund_count > 0 {
            self.fund_count
        } else {
            self.fund_details.len()
        }
    }

    pub fn is_today_positive(&self) -> bool {
        self.today_revenue >= 0.0
    }

    pub fn is_total_positive(&self) -> bool {
        self.total_revenue() >= 0.0
    }

    /// Recherche d'un détail par code (pour le graphique de tendance)
    pub fn find_fund(&self, fund_code: &str) -> Option<&FundDetail> {
        self.fund_details.iter().find(|f| f.fund_code == fund_code)
    }
}

// ============================================================================
// Helpers serde
// ============================================================================

/// `null` devient T::default()
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepte une liste de variations ; tout autre forme (chaîne, null, ...)
/// signifie "pas de données de tendance". Les lignes illisibles sont ignorées.
fn lenient_changes<'de, D>(deserializer: D) -> Result<Vec<RecentChange>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        other => {
            debug!(kind = ?other, "recent_changes is not a list, ignoring");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "total_cost": 2234.5,
        "yesterday_holding_amount": 2300.0,
        "yesterday_holding_income": 60.0,
        "today_revenue": -5.0,
        "today_holding_amount": 2295.0,
        "low_fund_list": ["Fund A down: -3.5%"],
        "high_fund_list": [],
        "fund_details": [
            {
                "fund_code": "110011", "fund_name": "Fund A", "cost": 1234.5,
                "amount": 1300.0, "cost_price": 1.2345, "shangrijingzhi": 1.3,
                "today_value": 1.28, "change_rate": "-1.54%", "today_revenue": -20.0,
                "total_revenue": 45.5, "profit_loss_ratio": 3.69,
                "recent_changes": [
                    {"date": "2024-03-05", "unit_nav": 1.30, "daily_growth": "0.5%", "daily_growth_value": 0.5},
                    {"date": "2024-03-04", "unit_nav": 1.29, "daily_growth": "-0.2%", "daily_growth_value": -0.2}
                ]
            },
            {
                "fund_code": "000001", "fund_name": null, "cost": 1000.0,
                "today_value": 1.01, "shangrijingzhi": 1.0,
                "total_revenue": -12.0, "recent_changes": "0.1% , 0.2%"
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let summary: PortfolioSummary = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(summary.fund_details.len(), 2);
        assert_eq!(summary.displayed_fund_count(), 2);
        assert!((summary.total_revenue() - 33.5).abs() < 1e-9);
        assert!(!summary.is_today_positive());

        let a = summary.find_fund("110011").unwrap();
        assert_eq!(a.recent_changes.len(), 2);
        assert!(a.is_change_negative());
        assert!(!a.is_up_from_previous_nav());

        let b = summary.find_fund("000001").unwrap();
        assert_eq!(b.fund_name, "");
        assert!(!b.has_trend_data());
        assert!(b.is_up_from_previous_nav());
        assert_eq!(b.change_rate_label(), "0.00%");
    }

    #[test]
    fn test_missing_everything_defaults_to_zero() {
        let summary: PortfolioSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary, PortfolioSummary::empty());
        assert_eq!(summary.total_revenue(), 0.0);
        assert!(summary.is_today_positive());
    }

    #[test]
    fn test_explicit_fund_count_wins() {
        let summary: PortfolioSummary =
            serde_json::from_str(r#"{"fund_count": 4, "fund_details": []}"#).unwrap();
        assert_eq!(summary.displayed_fund_count(), 4);
    }
}
