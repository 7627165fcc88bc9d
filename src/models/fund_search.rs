// ============================================================================
// Résultats de recherche de fonds
// ============================================================================

use serde::{Deserialize, Serialize};

/// Un fonds trouvé par GET /api/funds/search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub fund_code: String,
    pub fund_name: String,
    #[serde(default)]
    pub fund_type: Option<String>,
}

impl SearchResult {
    pub fn new(fund_code: &str, fund_name: &str, fund_type: Option<&str>) -> Self {
        Self {
            fund_code: fund_code.to_string(),
            fund_name: fund_name.to_string(),
            fund_type: fund_type.map(str::to_string),
        }
    }
}

/// Provenance d'un lot de résultats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    /// Réponse du backend
    Remote,
    /// Backend injoignable : liste embarquée filtrée localement
    LocalFallback,
}

/// Fonds qu'on a choisi dans la liste de résultats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundSelection {
    pub fund_code: String,
    pub fund_name: String,
}

impl From<&SearchResult> for FundSelection {
    fn from(result: &SearchResult) -> Self {
        Self {
            fund_code: result.fund_code.clone(),
            fund_name: result.fund_name.clone(),
        }
    }
}
