// ============================================================================
// Configuration
// ============================================================================
// Valeurs par défaut, fichier JSON optionnel et surcharges par variables
// d'environnement.
//
// Ordre de priorité (du plus faible au plus fort) :
// 1. Config::default()
// 2. <config_dir>/fundfolio/config.json
// 3. FUNDFOLIO_API_URL / FUNDFOLIO_DATA_DIR
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Nom de l'application (répertoires, logs)
pub const APP_NAME: &str = "fundfolio";

/// Configuration de l'application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL du backend, sans le préfixe /api (ex: "http://127.0.0.1:8000")
    pub api_base_url: String,

    /// Répertoire du fichier de session (session.json)
    pub data_dir: PathBuf,

    /// Répertoire des logs (rotation quotidienne)
    pub log_dir: PathBuf,

    /// Délai de debounce de la recherche de fonds
    pub search_debounce_ms: u64,

    /// Nombre max de résultats demandés au backend
    pub search_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);

        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            log_dir: data_dir.join("logs"),
            data_dir,
            search_debounce_ms: 300,
            search_limit: 10,
        }
    }
}

impl Config {
    /// Charge la configuration complète (fichier + environnement)
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// ~/.config/fundfolio/config.json (selon la plateforme)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
    }

    /// Lit un fichier JSON ; les champs absents gardent leur valeur par défaut
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Configuration invalide dans {}", path.display()))
    }

    /// Applique les surcharges d'environnement
    ///
    /// CONCEPT RUST : closure en paramètre
    /// - `lookup` abstrait std::env::var pour pouvoir tester sans toucher
    ///   à l'environnement du process
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FUNDFOLIO_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }

        if let Some(dir) = lookup("FUNDFOLIO_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            let dir = PathBuf::from(dir);
            self.log_dir = dir.join("logs");
            self.data_dir = dir;
        }

        if self.search_debounce_ms == 0 {
            warn!("search_debounce_ms = 0, falling back to 300ms");
            self.search_debounce_ms = 300;
        }
    }

    /// URL de base sans slash final
    pub fn api_root(&self) -> String {
        self.api_base_url.trim_end_matches('/').to_string()
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search_debounce_ms, 300);
        assert_eq!(config.search_limit, 10);
        assert!(config.session_path().ends_with("session.json"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "FUNDFOLIO_API_URL" => Some("http://funds.local:9000/".to_string()),
            "FUNDFOLIO_DATA_DIR" => Some("/tmp/ff".to_string()),
            _ => None,
        });

        assert_eq!(config.api_root(), "http://funds.local:9000");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ff"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/ff/logs"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "api_base_url": "http://example.org" }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api_base_url, "http://example.org");
        assert_eq!(config.search_limit, 10);
    }
}
