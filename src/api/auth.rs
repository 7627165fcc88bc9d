// ============================================================================
// LoginManager : connexion au backend
// ============================================================================
// POST /api/auth/login (formulaire urlencoded) -> { access_token }
//
// Une seule tentative par soumission, pas de backoff. Rien n'est persisté
// en cas d'échec.
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::client::error_detail;
use crate::api::transport::{ApiRequest, HttpTransport, Transport};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::session::{SavedCredentials, Session, SessionStore};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Gestionnaire de connexion
#[derive(Clone)]
pub struct LoginManager {
    transport: Arc<dyn Transport>,
    store: SessionStore,
}

impl LoginManager {
    pub fn new(transport: Arc<dyn Transport>, store: SessionStore) -> Self {
        Self { transport, store }
    }

    pub fn from_config(config: &Config, store: SessionStore) -> ClientResult<Self> {
        let transport = HttpTransport::new(&config.api_root())?;
        Ok(Self::new(Arc::new(transport), store))
    }

    /// Identifiants mémorisés pour préremplir le formulaire
    pub fn saved_credentials(&self) -> Option<SavedCredentials> {
        self.store.saved_credentials()
    }

    /// Tente une connexion ; en cas de succès la session est persistée
    ///
    /// `now` est l'horodatage enregistré comme date de connexion.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
        now: DateTime<Utc>,
    ) -> ClientResult<Session> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::validation("Please enter username and password"));
        }

        let request = ApiRequest::new(Method::POST, "/api/auth/login")
            .form(&[("username", username), ("password", password)]);
        let response = self.transport.send(request).await?;

        if response.status == 401 {
            info!("Login rejected");
            return Err(ClientError::Server {
                status: 401,
                detail: "Incorrect username or password".to_string(),
            });
        }

        if !response.is_success() {
            return Err(ClientError::Server {
                status: response.status,
                detail: error_detail(&response.body, "Login failed"),
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let session = Session::new(token.access_token, username.to_string(), now);
        self.store.save_session(&session)?;

        let credentials = remember.then(|| SavedCredentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        if let Err(e) = self.store.remember_credentials(credentials.as_ref()) {
            // La session est valide même si l'option "remember" échoue
            warn!(error = %e, "Failed to update remembered credentials");
        }

        info!(user = %username, remember, "Login successful");
        Ok(session)
    }
}

/// Message à afficher sous le formulaire de connexion
pub fn login_error_message(error: &ClientError) -> String {
    match error {
        ClientError::Network(_) => "Login request failed, please check your network connection".to_string(),
        other => other.to_string(),
    }
}
