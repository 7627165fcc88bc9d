// ============================================================================
// Session : stockage local + contrôle de validité
// ============================================================================
// SessionStore : petit magasin clé/valeur (chaînes) persisté en JSON
// SessionGate  : décide au démarrage si l'utilisateur est authentifié
//
// CONCEPT RUST : Arc<Mutex<T>> derrière un handle clonable
// - L'UI et le worker thread partagent le même store
// - Chaque clone pointe vers les mêmes données
// - Le verrou est pris le moins longtemps possible
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

// Clés persistées
pub const KEY_TOKEN: &str = "authToken";
pub const KEY_USER: &str = "currentUser";
pub const KEY_LAST_LOGIN: &str = "last_login";
pub const KEY_SAVED_CREDENTIALS: &str = "saved_credentials";
pub const KEY_REMEMBER_ME: &str = "remember_me";

/// Durée de vie d'une session locale
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

// ============================================================================
// Données de session
// ============================================================================

/// Utilisateur connecté
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Identifiants mémorisés ("Remember me")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCredentials {
    pub username: String,
    pub password: String,
}

/// Preuve d'authentification côté client
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub last_login: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, username: String, last_login: DateTime<Utc>) -> Self {
        Self {
            token,
            user: User { username },
            last_login,
        }
    }

    /// Âge de la session à l'instant `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_login
    }

    /// Une session est valide strictement moins de 7 jours
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.age(now) < Duration::days(SESSION_MAX_AGE_DAYS)
    }
}

// ============================================================================
// SessionStore
// ============================================================================

#[derive(Debug, Default)]
struct StoreInner {
    values: BTreeMap<String, String>,
    /// None : store purement en mémoire (tests)
    path: Option<PathBuf>,
}

/// Magasin clé/valeur persisté, partagé entre threads
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl SessionStore {
    /// Store en mémoire, rien n'est écrit sur disque
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Ouvre (ou crée) le fichier JSON de session
    ///
    /// Un fichier illisible est ignoré avec un warning : l'utilisateur
    /// devra simplement se reconnecter.
    pub fn open(path: PathBuf) -> ClientResult<Self> {
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| ClientError::Storage(format!("{}: {}", path.display(), e)))?;
            match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupted session file, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = values.len(), "Session store opened");
        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner {
                values,
                path: Some(path),
            })),
        })
    }

    // Un verrou empoisonné n'invalide pas une simple map de chaînes
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> ClientResult<()> {
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), value.into());
        Self::flush(&inner)
    }

    /// Écrit plusieurs clés avec une seule écriture disque
    pub fn set_many(&self, entries: &[(&str, String)]) -> ClientResult<()> {
        let mut inner = self.lock();
        for (key, value) in entries {
            inner.values.insert((*key).to_string(), value.clone());
        }
        Self::flush(&inner)
    }

    pub fn remove_many(&self, keys: &[&str]) -> ClientResult<()> {
        let mut inner = self.lock();
        let mut changed = false;
        for key in keys {
            changed |= inner.values.remove(*key).is_some();
        }
        if changed {
            Self::flush(&inner)
        } else {
            Ok(())
        }
    }

    fn flush(inner: &StoreInner) -> ClientResult<()> {
        let Some(path) = &inner.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Storage(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(&inner.values)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ClientError::Storage(format!("{}: {}", path.display(), e)))
    }

    // ========================================================================
    // Accès typés
    // ========================================================================

    pub fn token(&self) -> Option<String> {
        self.get(KEY_TOKEN).filter(|t| !t.is_empty())
    }

    /// Lit la session complète ; None si une pièce manque ou est illisible
    pub fn session(&self) -> Option<Session> {
        let token = self.token()?;
        let user: User = serde_json::from_str(&self.get(KEY_USER)?).ok()?;
        let last_login = DateTime::parse_from_rfc3339(&self.get(KEY_LAST_LOGIN)?)
            .ok()?
            .with_timezone(&Utc);

        Some(Session {
            token,
            user,
            last_login,
        })
    }

    /// Persiste une session fraîchement créée
    pub fn save_session(&self, session: &Session) -> ClientResult<()> {
        let user = serde_json::to_string(&session.user)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.set_many(&[
            (KEY_TOKEN, session.token.clone()),
            (KEY_USER, user),
            (KEY_LAST_LOGIN, session.last_login.to_rfc3339()),
        ])
    }

    /// Efface token, utilisateur et date de connexion
    /// (les identifiants mémorisés sont conservés)
    pub fn clear_session(&self) -> ClientResult<()> {
        self.remove_many(&[KEY_TOKEN, KEY_USER, KEY_LAST_LOGIN])
    }

    /// Mémorise (Some) ou oublie (None) les identifiants
    pub fn remember_credentials(&self, credentials: Option<&SavedCredentials>) -> ClientResult<()> {
        match credentials {
            Some(credentials) => {
                let json = serde_json::to_string(credentials)
                    .map_err(|e| ClientError::Storage(e.to_string()))?;
                self.set_many(&[
                    (KEY_SAVED_CREDENTIALS, json),
                    (KEY_REMEMBER_ME, "true".to_string()),
                ])
            }
            None => {
                self.remove_many(&[KEY_SAVED_CREDENTIALS])?;
                self.set(KEY_REMEMBER_ME, "false")
            }
        }
    }

    /// Identifiants mémorisés, seulement si remember_me == "true"
    pub fn saved_credentials(&self) -> Option<SavedCredentials> {
        if self.get(KEY_REMEMBER_ME).as_deref() != Some("true") {
            return None;
        }
        let raw = self.get(KEY_SAVED_CREDENTIALS)?;
        match serde_json::from_str(&raw) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(error = %e, "Unreadable saved credentials");
                None
            }
        }
    }
}

// ============================================================================
// SessionGate
// ============================================================================

/// Résultat du contrôle de session
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Authenticated(Session),
    Unauthenticated,
}

/// Contrôle de validité au chargement
pub struct SessionGate;

impl SessionGate {
    /// Vérifie la session persistée à l'instant `now`
    ///
    /// Session absente, incomplète ou âgée de 7 jours ou plus :
    /// les champs de session sont effacés et l'utilisateur doit se connecter.
    pub fn check(store: &SessionStore, now: DateTime<Utc>) -> GateOutcome {
        match store.session() {
            Some(session) if session.is_fresh(now) => {
                info!(user = %session.user.username, "Session valid");
                GateOutcome::Authenticated(session)
            }
            Some(session) => {
                info!(
                    user = %session.user.username,
                    age_days = session.age(now).num_days(),
                    "Session expired"
                );
                Self::clear(store);
                GateOutcome::Unauthenticated
            }
            None => {
                debug!("No usable session");
                Self::clear(store);
                GateOutcome::Unauthenticated
            }
        }
    }

    /// Efface la session ; une erreur disque est seulement loggée
    pub fn clear(store: &SessionStore) {
        if let Err(e) = store.clear_session() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_session(last_login: DateTime<Utc>) -> SessionStore {
        let store = SessionStore::in_memory();
        store
            .save_session(&Session::new("tok".to_string(), "alice".to_string(), last_login))
            .unwrap();
        store
    }

    #[test]
    fn test_fresh_session_is_authenticated() {
        let now = Utc::now();
        let store = store_with_session(now - Duration::days(6));

        match SessionGate::check(&store, now) {
            GateOutcome::Authenticated(session) => {
                assert_eq!(session.token, "tok");
                assert_eq!(session.user.username, "alice");
            }
            other => panic!("expected authenticated, got {:?}", other),
        }
        assert!(store.token().is_some());
    }

    #[test]
    fn test_session_of_seven_days_or_more_is_cleared() {
        let now = Utc::now();
        for age in [Duration::days(7), Duration::days(7) + Duration::seconds(1), Duration::days(30)] {
            let store = store_with_session(now - age);
            assert_eq!(SessionGate::check(&store, now), GateOutcome::Unauthenticated);
            assert!(store.get(KEY_TOKEN).is_none());
            assert!(store.get(KEY_USER).is_none());
            assert!(store.get(KEY_LAST_LOGIN).is_none());
        }
    }

    #[test]
    fn test_incomplete_session_is_cleared() {
        let store = SessionStore::in_memory();
        store.set(KEY_TOKEN, "orphan").unwrap();

        assert_eq!(SessionGate::check(&store, Utc::now()), GateOutcome::Unauthenticated);
        assert!(store.get(KEY_TOKEN).is_none());
    }

    #[test]
    fn test_clear_keeps_remembered_credentials() {
        let store = store_with_session(Utc::now());
        let creds = SavedCredentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };
        store.remember_credentials(Some(&creds)).unwrap();

        store.clear_session().unwrap();
        assert!(store.session().is_none());
        assert_eq!(store.saved_credentials(), Some(creds));
    }

    #[test]
    fn test_forget_credentials() {
        let store = SessionStore::in_memory();
        let creds = SavedCredentials {
            username: "bob".to_string(),
            password: "pw".to_string(),
        };
        store.remember_credentials(Some(&creds)).unwrap();
        store.remember_credentials(None).unwrap();

        assert_eq!(store.get(KEY_REMEMBER_ME).as_deref(), Some("false"));
        assert!(store.get(KEY_SAVED_CREDENTIALS).is_none());
        assert!(store.saved_credentials().is_none());
    }

    #[test]
    fn test_store_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::open(path.clone()).unwrap();
        store.set(KEY_TOKEN, "abc").unwrap();

        let reopened = SessionStore::open(path).unwrap();
        assert_eq!(reopened.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_corrupted_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = SessionStore::open(path).unwrap();
        assert!(store.token().is_none());
    }
}
