// ============================================================================
// Erreurs du client
// ============================================================================
// Taxonomie typée des erreurs remontées par l'API et les formulaires
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] implémente std::error::Error automatiquement
// - #[error("...")] génère l'implémentation de Display
// - Chaque variant porte ses propres données
// ============================================================================

use thiserror::Error;

/// Erreurs possibles lors d'une action utilisateur
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// 401 ou session absente : la session est effacée, retour au login
    #[error("Session expired, please log in again")]
    AuthExpired,

    /// Saisie invalide ou sélection manquante (aucun appel réseau)
    #[error("{0}")]
    Validation(String),

    /// Réponse non-2xx avec le détail fourni par le serveur
    #[error("{detail}")]
    Server { status: u16, detail: String },

    /// Échec au niveau transport (connexion refusée, DNS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Corps de réponse illisible
    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// Le graphique n'a pas pu être construit ou affiché
    #[error("Chart rendering failed: {0}")]
    Render(String),

    /// Lecture / écriture du fichier de session
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Raccourci pour les erreurs de validation
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Vrai si le serveur a répondu avec ce code HTTP
    pub fn has_status(&self, code: u16) -> bool {
        matches!(self, Self::Server { status, .. } if *status == code)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_detail_verbatim() {
        let err = ClientError::Server {
            status: 404,
            detail: "Fund not found".to_string(),
        };
        assert_eq!(err.to_string(), "Fund not found");
        assert!(err.has_status(404));
        assert!(!err.has_status(500));
    }

    #[test]
    fn test_auth_expired() {
        assert!(ClientError::AuthExpired.is_auth_expired());
        assert!(!ClientError::validation("x").is_auth_expired());
    }
}
