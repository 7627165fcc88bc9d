// ============================================================================
// Recherche de fonds : debounce + jetons de séquence
// ============================================================================
// Chaque frappe réarme un délai fixe ; la requête part seulement quand le
// délai expire. Chaque requête émise reçoit un jeton croissant, et seule
// la réponse portant le dernier jeton est appliquée : une réponse tardive
// d'une recherche précédente est jetée.
//
// CONCEPT : temps injecté
// - Les méthodes prennent `now: Instant` au lieu d'appeler Instant::now()
// - L'event loop fournit l'heure, les tests la simulent
// ============================================================================

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::models::{SearchResult, SearchSource};

/// En dessous de 2 caractères aucune requête n'est émise
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Recherche prête à partir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub token: u64,
    pub keyword: String,
}

/// État affiché sous le champ de recherche
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Idle,
    /// Requête partie, réponse attendue
    Loading,
    Results,
    Empty,
    Failed(String),
}

/// Debounce + résultats de la recherche en cours
#[derive(Debug)]
pub struct FundSearch {
    debounce: Duration,
    /// Mot-clé en attente et instant où il doit partir
    pending: Option<(String, Instant)>,
    latest_token: u64,
    results: Vec<SearchResult>,
    source: SearchSource,
    status: SearchStatus,
    highlighted: usize,
}

impl FundSearch {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: None,
            latest_token: 0,
            results: Vec::new(),
            source: SearchSource::Remote,
            status: SearchStatus::Idle,
            highlighted: 0,
        }
    }

    /// Le texte du champ a changé
    pub fn on_input(&mut self, raw: &str, now: Instant) {
        let keyword = raw.trim();

        if keyword.chars().count() < MIN_KEYWORD_CHARS {
            // Trop court : on annule tout, y compris une réponse en vol
            self.pending = None;
            self.invalidate_in_flight();
            self.clear_results();
            return;
        }

        self.pending = Some((keyword.to_string(), now + self.debounce));
    }

    /// Émet la recherche si son délai est écoulé
    pub fn poll(&mut self, now: Instant) -> Option<SearchTicket> {
        match &self.pending {
            Some((_, due)) if now >= *due => {}
            _ => return None,
        }

        let (keyword, _) = self.pending.take()?;
        self.latest_token += 1;
        self.status = SearchStatus::Loading;
        debug!(token = self.latest_token, keyword = %keyword, "Search issued");

        Some(SearchTicket {
            token: self.latest_token,
            keyword,
        })
    }

    pub fn is_latest(&self, token: u64) -> bool {
        token == self.latest_token
    }

    /// Applique une réponse ; false si elle est périmée (jetée)
    pub fn apply(&mut self, token: u64, outcome: ClientResult<(Vec<SearchResult>, SearchSource)>) -> bool {
        if !self.is_latest(token) {
            debug!(token, latest = self.latest_token, "Discarding stale search response");
            return false;
        }

        match outcome {
            Ok((results, source)) => {
                self.status = if results.is_empty() {
                    SearchStatus::Empty
                } else {
                    SearchStatus::Results
                };
                self.results = results;
                self.source = source;
            }
            Err(e) => {
                self.results.clear();
                self.status = SearchStatus::Failed(e.to_string());
            }
        }
        self.highlighted = 0;
        true
    }

    /// Remise à zéro complète (fermeture du formulaire)
    pub fn reset(&mut self) {
        self.pending = None;
        self.invalidate_in_flight();
        self.clear_results();
    }

    fn invalidate_in_flight(&mut self) {
        // Un jeton jamais émis : toute réponse en vol devient périmée
        self.latest_token += 1;
    }

    fn clear_results(&mut self) {
        self.results.clear();
        self.status = SearchStatus::Idle;
        self.highlighted = 0;
    }

    /// Ferme la liste déroulante sans toucher à la sélection
    pub fn hide_results(&mut self) {
        self.clear_results();
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn source(&self) -> SearchSource {
        self.source
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted(&self) -> Option<&SearchResult> {
        self.results.get(self.highlighted)
    }

    pub fn highlight_next(&mut self) {
        let max_index = self.results.len().saturating_sub(1);
        self.highlighted = (self.highlighted + 1).min(max_index);
    }

    pub fn highlight_previous(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }
}

// ============================================================================
// Liste de secours embarquée
// ============================================================================

/// Fonds connus utilisés quand le backend est injoignable
const LOCAL_FUNDS: [(&str, &str, &str); 5] = [
    ("000001", "华夏成长混合", "混合型"),
    ("000002", "华夏大盘精选", "股票型"),
    ("000003", "华夏现金增利货币A", "货币型"),
    ("110011", "易方达中小盘混合", "混合型"),
    ("161725", "招商中证白酒指数(LOF)A", "指数型"),
];

/// Filtre la liste embarquée : sous-chaîne insensible à la casse
/// sur le nom ou le code
pub fn local_fallback(keyword: &str) -> Vec<SearchResult> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    LOCAL_FUNDS
        .iter()
        .filter(|(code, name, _)| {
            name.to_lowercase().contains(&needle) || code.to_lowercase().contains(&needle)
        })
        .map(|(code, name, kind)| SearchResult::new(code, name, Some(kind)))
        .collect()
}

/// Recherche distante avec repli local sur panne réseau
///
/// Seules les pannes de transport (et les réponses illisibles) basculent sur
/// la liste locale ; une erreur HTTP du backend et AuthExpired remontent.
pub async fn search_with_fallback(
    api: &ApiClient,
    keyword: &str,
    limit: u32,
) -> ClientResult<(Vec<SearchResult>, SearchSource)> {
    match api.search_funds(keyword, limit).await {
        Ok(results) => Ok((results, SearchSource::Remote)),
        Err(ClientError::Network(reason)) | Err(ClientError::Decode(reason)) => {
            warn!(keyword = %keyword, reason = %reason, "Search backend unavailable, using offline list");
            Ok((local_fallback(keyword), SearchSource::LocalFallback))
        }
        Err(ClientError::Server { status, .. }) => {
            debug!(status, "Search failed on backend");
            Err(ClientError::Server {
                status,
                detail: "Search failed, please try again later".to_string(),
            })
        }
        Err(other) => Err(other),
    }
}
