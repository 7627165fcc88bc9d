// ============================================================================
// Module : api
// ============================================================================
// Accès au backend du portefeuille : transport HTTP, client authentifié,
// connexion.
// ============================================================================

pub mod auth;       // LoginManager
pub mod client;     // ApiClient (politique d'erreur commune)
pub mod transport;  // Trait Transport + implémentation reqwest

// Re-exports
pub use auth::LoginManager;
pub use client::ApiClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};
