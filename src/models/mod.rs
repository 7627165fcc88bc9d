// ============================================================================
// Module : models
// ============================================================================
// Structures de données échangées avec le backend
// ============================================================================

pub mod fund_search;  // Résultats de recherche et sélection
pub mod holding;      // Positions (FundHolding) et corps de requêtes
pub mod summary;      // Résumé calculé du portefeuille

// Re-export des structures principales
pub use fund_search::{FundSelection, SearchResult, SearchSource};
pub use holding::{FundHolding, HoldingUpdate, NewHolding};
pub use summary::{FundDetail, PortfolioSummary, RecentChange};
