// ============================================================================
// ApiClient : point de passage unique des appels authentifiés
// ============================================================================
// Politique d'erreur commune à tous les appels :
// - pas de token          -> AuthExpired, aucune requête envoyée
// - HTTP 401              -> session effacée, AuthExpired
// - HTTP non-2xx          -> Server { detail } (message du backend)
// - panne de transport    -> Network
// - JSON illisible        -> Decode
//
// L'UI affiche tout sauf AuthExpired, qui déclenche la redirection.
// ============================================================================

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::api::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{FundHolding, HoldingUpdate, NewHolding, PortfolioSummary, SearchResult};
use crate::session::{SessionGate, SessionStore};

/// Client du backend de portefeuille
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: SessionStore,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: SessionStore) -> Self {
        Self { transport, store }
    }

    /// Client reqwest vers l'URL configurée
    pub fn from_config(config: &Config, store: SessionStore) -> ClientResult<Self> {
        let transport = HttpTransport::new(&config.api_root())?;
        Ok(Self::new(Arc::new(transport), store))
    }

    // ========================================================================
    // Opérations
    // ========================================================================

    /// GET /api/funds/
    pub async fn list_funds(&self) -> ClientResult<Vec<FundHolding>> {
        self.request_json(ApiRequest::new(Method::GET, "/api/funds/")).await
    }

    /// POST /api/funds/
    pub async fn create_fund(&self, fund: &NewHolding) -> ClientResult<FundHolding> {
        let body = to_json(fund)?;
        self.request_json(ApiRequest::new(Method::POST, "/api/funds/").json(body))
            .await
    }

    /// PUT /api/funds/{id}
    pub async fn update_fund(&self, id: i64, update: &HoldingUpdate) -> ClientResult<FundHolding> {
        let body = to_json(update)?;
        self.request_json(ApiRequest::new(Method::PUT, format!("/api/funds/{}", id)).json(body))
            .await
    }

    /// DELETE /api/funds/{id} ; le corps de réponse est ignoré
    pub async fn delete_fund(&self, id: i64) -> ClientResult<()> {
        self.dispatch(ApiRequest::new(Method::DELETE, format!("/api/funds/{}", id)))
            .await
            .map(|_| ())
    }

    /// GET /api/funds/calculate
    pub async fn calculate_portfolio(&self) -> ClientResult<PortfolioSummary> {
        self.request_json(ApiRequest::new(Method::GET, "/api/funds/calculate"))
            .await
    }

    /// GET /api/funds/search?q=&limit=
    pub async fn search_funds(&self, keyword: &str, limit: u32) -> ClientResult<Vec<SearchResult>> {
        self.request_json(
            ApiRequest::new(Method::GET, "/api/funds/search")
                .query("q", keyword)
                .query("limit", limit),
        )
        .await
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let response = self.dispatch(request).await?;
        serde_json::from_str(&response.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Ajoute le token, envoie, applique la politique d'erreur
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn dispatch(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        // Session déjà effacée (401 précédent, logout) : on n'envoie rien
        let Some(token) = self.store.token() else {
            debug!("No session token, request not sent");
            return Err(ClientError::AuthExpired);
        };

        let response = self.transport.send(request.bearer(Some(token))).await?;

        if response.status == 401 {
            warn!("Backend rejected token, clearing session");
            SessionGate::clear(&self.store);
            return Err(ClientError::AuthExpired);
        }

        if !response.is_success() {
            let detail = error_detail(&response.body, "Request failed");
            info!(status = response.status, detail = %detail, "Backend returned an error");
            return Err(ClientError::Server {
                status: response.status,
                detail,
            });
        }

        Ok(response)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> ClientResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Extrait `detail` d'un corps d'erreur FastAPI
///
/// `detail` peut être une chaîne ou une structure (erreurs de validation) ;
/// la structure est rendue en JSON compact.
pub(crate) fn error_detail(body: &str, fallback: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Option<serde_json::Value>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.detail);

    match detail {
        Some(serde_json::Value::String(text)) if !text.is_empty() => text,
        Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => fallback.to_string(),
        Some(structured) => structured.to_string(),
    }
}
