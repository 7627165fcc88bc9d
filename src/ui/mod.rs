// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod events;    // Gestion des événements clavier
pub mod dashboard; // Routeur de rendu (header, footer, modals)
pub mod login;     // Écran de connexion
pub mod portfolio; // Résumé + tableau détaillé
pub mod funds;     // Liste des positions
pub mod modal;     // Formulaire ajout / édition + recherche
pub mod chart;     // Modal du graphique de tendance

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler};
