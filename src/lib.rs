// ============================================================================
// Fundfolio - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // Client HTTP du backend (auth, fonds, recherche)
pub mod app;     // État de l'application
pub mod chart;   // Graphique de tendance (séries + cycle de vie)
pub mod config;  // Configuration (fichier + variables d'environnement)
pub mod error;   // ClientError
pub mod models;  // Structures de données
pub mod search;  // Recherche de fonds (debounce, jetons, repli local)
pub mod session; // Session persistée + SessionGate
pub mod ui;      // Interface utilisateur
pub mod worker;  // Thread d'arrière-plan (appels réseau)
