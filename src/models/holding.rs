// ============================================================================
// Structure : FundHolding
// ============================================================================
// Une ligne de portefeuille : un fonds acheté à un prix de revient donné
//
// Le backend en est propriétaire ; le client ne fait que l'afficher et
// envoyer des créations / modifications.
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Position détenue, telle que renvoyée par GET /api/funds/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHolding {
    pub id: i64,
    pub fund_code: String,
    #[serde(default)]
    pub fund_name: Option<String>,
    pub cost_price: f64,
    pub shares: f64,
}

impl FundHolding {
    /// Coût d'achat = prix de revient × parts
    pub fn purchase_cost(&self) -> f64 {
        self.cost_price * self.shares
    }

    /// "Nom(CODE)" ou seulement le code si le nom est inconnu
    pub fn display_name(&self) -> String {
        match self.fund_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{}({})", name, self.fund_code),
            None => self.fund_code.clone(),
        }
    }

    pub fn cost_price_label(&self) -> String {
        format!("¥{:.4}", self.cost_price)
    }

    pub fn shares_label(&self) -> String {
        format_thousands(self.shares)
    }

    pub fn purchase_cost_label(&self) -> String {
        format!("¥{:.2}", self.purchase_cost())
    }
}

/// Corps de POST /api/funds/
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHolding {
    pub fund_code: String,
    pub fund_name: String,
    pub cost_price: f64,
    pub shares: f64,
}

/// Corps de PUT /api/funds/{id}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingUpdate {
    pub fund_code: String,
    pub cost_price: f64,
    pub shares: f64,
}

// ============================================================================
// Validation des saisies
// ============================================================================
// CONCEPT RUST : parse::<f64>() retourne un Result
// - map_err convertit l'erreur de parsing en ClientError::Validation
// - aucune requête n'est envoyée si la saisie est invalide
// ============================================================================

/// Prix de revient : nombre > 0 (précision 0.0001)
pub fn parse_cost_price(input: &str) -> ClientResult<f64> {
    parse_positive(input, "Cost price", 0.0001)
}

/// Nombre de parts : nombre > 0 (précision 0.01)
pub fn parse_shares(input: &str) -> ClientResult<f64> {
    parse_positive(input, "Shares", 0.01)
}

fn parse_positive(input: &str, field: &str, minimum: f64) -> ClientResult<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(format!("{} is required", field)));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| ClientError::validation(format!("{} must be a number, got '{}'", field, trimmed)))?;

    if !value.is_finite() || value < minimum {
        return Err(ClientError::validation(format!(
            "{} must be at least {}",
            field, minimum
        )));
    }

    Ok(value)
}

/// 12345.5 -> "12,345.5" (séparateur de milliers, décimales conservées)
pub fn format_thousands(value: f64) -> String {
    let raw = format!("{}", value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (raw.clone(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(cost_price: f64, shares: f64) -> FundHolding {
        FundHolding {
            id: 1,
            fund_code: "110011".to_string(),
            fund_name: Some("E Fund Small Cap".to_string()),
            cost_price,
            shares,
        }
    }

    #[test]
    fn test_purchase_cost_rounds_to_cents() {
        let h = holding(1.2345, 1000.0);
        assert_eq!(h.purchase_cost_label(), "¥1234.50");
        assert_eq!(h.cost_price_label(), "¥1.2345");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(holding(1.0, 1.0).display_name(), "E Fund Small Cap(110011)");

        let mut anonymous = holding(1.0, 1.0);
        anonymous.fund_name = None;
        assert_eq!(anonymous.display_name(), "110011");
    }

    #[test]
    fn test_deserialize_ignores_backend_extras() {
        let json = r#"{
            "id": 7, "user_id": 3, "fund_code": "000001", "fund_name": null,
            "cost_price": 1.5, "shares": 200.0, "created_at": "2024-01-01T00:00:00"
        }"#;
        let h: FundHolding = serde_json::from_str(json).unwrap();
        assert_eq!(h.id, 7);
        assert!(h.fund_name.is_none());
    }

    #[test]
    fn test_parse_inputs() {
        assert_eq!(parse_cost_price(" 1.2345 ").unwrap(), 1.2345);
        assert!(parse_cost_price("").is_err());
        assert!(parse_cost_price("abc").is_err());
        assert!(parse_cost_price("0").is_err());
        assert!(parse_shares("-5").is_err());
        assert!(parse_shares("0.001").is_err());
        assert_eq!(parse_shares("1000").unwrap(), 1000.0);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.25), "1,234,567.25");
        assert_eq!(format_thousands(12.5), "12.5");
    }
}
