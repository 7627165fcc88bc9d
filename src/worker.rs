// ============================================================================
// Background Worker
// ============================================================================
// L'event loop envoie des Command au worker ; le worker exécute l'appel
// backend dans son runtime tokio et renvoie un Outcome.
//
// CONCEPT RUST : Command pattern avec channels
// - mpsc::Sender<Command> : UI -> worker
// - mpsc::Sender<Outcome> : worker -> UI
// - L'UI ne bloque jamais sur le réseau
// ============================================================================

use std::sync::mpsc;
use std::thread::JoinHandle;

use chrono::Utc;
use tracing::{error, info};

use crate::api::{ApiClient, LoginManager};
use crate::error::ClientResult;
use crate::models::{FundHolding, HoldingUpdate, NewHolding, PortfolioSummary, SearchResult, SearchSource};
use crate::search::search_with_fallback;
use crate::session::Session;

/// Commandes envoyées au worker
#[derive(Clone, PartialEq)]
pub enum Command {
    Login {
        username: String,
        password: String,
        remember: bool,
    },
    LoadFunds,
    /// `announce` : afficher "rafraîchi" en cas de succès
    Calculate { announce: bool },
    AddFund(NewHolding),
    UpdateFund { id: i64, update: HoldingUpdate },
    DeleteFund { id: i64 },
    Search { token: u64, keyword: String },
}

// Pas de Debug dérivé : le mot de passe ne doit pas finir dans les logs
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Login { username, remember, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("remember", remember)
                .finish_non_exhaustive(),
            Command::LoadFunds => write!(f, "LoadFunds"),
            Command::Calculate { announce } => f.debug_struct("Calculate").field("announce", announce).finish(),
            Command::AddFund(fund) => f.debug_tuple("AddFund").field(fund).finish(),
            Command::UpdateFund { id, update } => f
                .debug_struct("UpdateFund")
                .field("id", id)
                .field("update", update)
                .finish(),
            Command::DeleteFund { id } => f.debug_struct("DeleteFund").field("id", id).finish(),
            Command::Search { token, keyword } => f
                .debug_struct("Search")
                .field("token", token)
                .field("keyword", keyword)
                .finish(),
        }
    }
}

/// Résultats renvoyés par le worker
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    LoggedIn(ClientResult<Session>),
    FundsLoaded(ClientResult<Vec<FundHolding>>),
    PortfolioCalculated {
        announce: bool,
        result: ClientResult<PortfolioSummary>,
    },
    FundAdded(ClientResult<FundHolding>),
    FundUpdated(ClientResult<FundHolding>),
    FundDeleted {
        id: i64,
        result: ClientResult<()>,
    },
    SearchFinished {
        token: u64,
        result: ClientResult<(Vec<SearchResult>, SearchSource)>,
    },
}

/// Dépendances du worker
#[derive(Clone)]
pub struct Services {
    pub api: ApiClient,
    pub login: LoginManager,
    pub search_limit: u32,
}

/// Exécute une commande (async, testable sans thread)
pub async fn execute(services: &Services, command: Command) -> Outcome {
    match command {
        Command::Login {
            username,
            password,
            remember,
        } => Outcome::LoggedIn(
            services
                .login
                .login(&username, &password, remember, Utc::now())
                .await,
        ),
        Command::LoadFunds => Outcome::FundsLoaded(services.api.list_funds().await),
        Command::Calculate { announce } => Outcome::PortfolioCalculated {
            announce,
            result: services.api.calculate_portfolio().await,
        },
        Command::AddFund(fund) => Outcome::FundAdded(services.api.create_fund(&fund).await),
        Command::UpdateFund { id, update } => Outcome::FundUpdated(services.api.update_fund(id, &update).await),
        Command::DeleteFund { id } => Outcome::FundDeleted {
            id,
            result: services.api.delete_fund(id).await,
        },
        Command::Search { token, keyword } => Outcome::SearchFinished {
            token,
            result: search_with_fallback(&services.api, &keyword, services.search_limit).await,
        },
    }
}

/// Lance le worker thread
///
/// CONCEPT : Runtime per-thread
/// - Le thread possède son propre runtime tokio
/// - block_on() bloque le worker, jamais l'UI
/// - La boucle se termine quand le Sender<Command> est droppé
pub fn spawn(
    services: Services,
    command_rx: mpsc::Receiver<Command>,
    outcome_tx: mpsc::Sender<Outcome>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Failed to create tokio runtime, worker not started");
                return;
            }
        };

        while let Ok(command) = command_rx.recv() {
            info!(?command, "Worker received command");
            let outcome = runtime.block_on(execute(&services, command));

            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }

        info!("Worker thread exiting (channel closed)");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::api::transport::fake::ScriptedTransport;
    use crate::session::SessionStore;

    fn services(transport: ScriptedTransport, store: SessionStore) -> Services {
        let transport = Arc::new(transport);
        Services {
            api: ApiClient::new(transport.clone(), store.clone()),
            login: LoginManager::new(transport, store),
            search_limit: 10,
        }
    }

    #[test]
    fn test_login_debug_redacts_password() {
        let command = Command::Login {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            remember: true,
        };
        let printed = format!("{:?}", command);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_login_then_calculate() {
        let store = SessionStore::in_memory();
        let services = services(
            ScriptedTransport::new()
                .reply(200, r#"{"access_token":"jwt"}"#)
                .reply(200, r#"{"today_revenue": 12.5}"#),
            store,
        );

        let outcome = execute(
            &services,
            Command::Login {
                username: "alice".to_string(),
                password: "pw".to_string(),
                remember: false,
            },
        )
        .await;
        assert!(matches!(outcome, Outcome::LoggedIn(Ok(_))));

        match execute(&services, Command::Calculate { announce: true }).await {
            Outcome::PortfolioCalculated { announce, result } => {
                assert!(announce);
                assert_eq!(result.unwrap().today_revenue, 12.5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_spawned_worker_round_trip() {
        let store = SessionStore::in_memory();
        store
            .save_session(&Session::new("tok".to_string(), "alice".to_string(), Utc::now()))
            .unwrap();
        let services = services(ScriptedTransport::new().reply(200, "{}"), store);

        let (command_tx, command_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let handle = spawn(services, command_rx, outcome_tx);

        command_tx.send(Command::DeleteFund { id: 9 }).unwrap();
        let outcome = outcome_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, Outcome::FundDeleted { id: 9, result: Ok(()) });

        drop(command_tx);
        handle.join().unwrap();
    }
}
