// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// - Les actions qui demandent le réseau retournent une Command que l'event
//   loop transmet au worker ; le résultat revient via App::apply()
//
// Le temps (`now: Instant`) est toujours injecté par l'appelant.
// ============================================================================

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::api::auth::login_error_message;
use crate::chart::ChartHost;
use crate::error::ClientError;
use crate::models::holding::{parse_cost_price, parse_shares};
use crate::models::{FundHolding, FundSelection, HoldingUpdate, NewHolding, PortfolioSummary, SearchSource};
use crate::search::FundSearch;
use crate::session::{GateOutcome, Session, SessionGate, SessionStore};
use crate::ui::portfolio::pick_caption;
use crate::worker::{Command, Outcome};

/// Délai avant retour au login après un 401
pub const AUTH_REDIRECT_DELAY: Duration = Duration::from_millis(500);
/// Délai avant retour au login après déconnexion
pub const LOGOUT_DELAY: Duration = Duration::from_millis(200);
/// Délai entre "connexion réussie" et l'écran portefeuille
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(500);
/// Durée d'affichage d'un message transitoire
pub const MESSAGE_TTL: Duration = Duration::from_secs(3);
/// Durée d'affichage d'une erreur sous le formulaire de connexion
pub const LOGIN_ERROR_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// Écrans et navigation
// ============================================================================

/// Écrans de l'application (un seul actif à la fois)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    /// Résumé du portefeuille + tableau détaillé
    Portfolio,
    /// Liste des positions (édition / suppression)
    FundsList,
}

/// Navigation différée (laisse le temps de lire le message)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    ToLogin,
    ToPortfolio,
}

// ============================================================================
// Messages transitoires
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub text: String,
    pub kind: MessageKind,
    pub expires_at: Instant,
}

// ============================================================================
// Formulaire de connexion
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
    Remember,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember: bool,
    pub focus: LoginField,
    pub submitting: bool,
    error: Option<Flash>,
}

impl LoginForm {
    /// Formulaire prérempli avec les identifiants mémorisés
    fn from_store(store: &SessionStore) -> Self {
        let saved = store.saved_credentials();
        Self {
            remember: saved.is_some(),
            username: saved.as_ref().map(|c| c.username.clone()).unwrap_or_default(),
            password: saved.map(|c| c.password).unwrap_or_default(),
            focus: LoginField::Username,
            submitting: false,
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.text.as_str())
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Remember,
            LoginField::Remember => LoginField::Username,
        };
    }

    pub fn previous_field(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Remember,
            LoginField::Password => LoginField::Username,
            LoginField::Remember => LoginField::Password,
        };
    }

    pub fn append_char(&mut self, c: char) {
        match self.focus {
            LoginField::Username => self.username.push(c),
            LoginField::Password => self.password.push(c),
            LoginField::Remember if c == ' ' => self.remember = !self.remember,
            LoginField::Remember => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            LoginField::Username => {
                self.username.pop();
            }
            LoginField::Password => {
                self.password.pop();
            }
            LoginField::Remember => {}
        }
    }
}

// ============================================================================
// Formulaire ajout / édition de fonds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Search,
    CostPrice,
    Shares,
}

static ADD_FIELDS: [FormField; 3] = [FormField::Search, FormField::CostPrice, FormField::Shares];
static EDIT_FIELDS: [FormField; 2] = [FormField::CostPrice, FormField::Shares];

#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Add,
    Edit {
        id: i64,
        fund_code: String,
        display_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundForm {
    pub mode: FormMode,
    pub search_input: String,
    pub cost_price: String,
    pub shares: String,
    pub focus: FormField,
}

impl FundForm {
    fn add() -> Self {
        Self {
            mode: FormMode::Add,
            search_input: String::new(),
            cost_price: String::new(),
            shares: String::new(),
            focus: FormField::Search,
        }
    }

    fn edit(holding: &FundHolding) -> Self {
        Self {
            mode: FormMode::Edit {
                id: holding.id,
                fund_code: holding.fund_code.clone(),
                display_name: holding.display_name(),
            },
            search_input: String::new(),
            cost_price: holding.cost_price.to_string(),
            shares: holding.shares.to_string(),
            focus: FormField::CostPrice,
        }
    }

    pub fn is_add(&self) -> bool {
        self.mode == FormMode::Add
    }

    pub fn title(&self) -> &'static str {
        if self.is_add() {
            "Add fund"
        } else {
            "Edit fund"
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        if self.is_add() {
            &ADD_FIELDS
        } else {
            &EDIT_FIELDS
        }
    }

    fn step_focus(&mut self, forward: bool) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (current + 1) % fields.len()
        } else {
            (current + fields.len() - 1) % fields.len()
        };
        self.focus = fields[next];
    }

    fn input_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Search => &mut self.search_input,
            FormField::CostPrice => &mut self.cost_price,
            FormField::Shares => &mut self.shares,
        }
    }
}

/// Modal du graphique de tendance (slot distinct du formulaire)
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModal {
    pub fund_code: String,
    pub fund_name: String,
    /// Message affiché à la place du graphique si sa construction a échoué
    pub error: Option<String>,
}

// ============================================================================
// App
// ============================================================================

/// État principal de l'application
pub struct App {
    running: bool,
    confirm_quit: bool,
    confirm_delete: bool,
    screen: Screen,
    store: SessionStore,
    session: Option<Session>,

    /// Slot unique du résumé, remplacé en bloc à chaque rafraîchissement
    summary: Option<PortfolioSummary>,
    caption: &'static str,
    funds: Vec<FundHolding>,
    selected_row: usize,
    selected_fund_index: usize,

    form: Option<FundForm>,
    chart_modal: Option<ChartModal>,
    charts: ChartHost,
    search: FundSearch,
    selected_fund: Option<FundSelection>,

    login: LoginForm,
    message: Option<Flash>,
    pending_navigation: Option<(Navigation, Instant)>,
    loading: Option<String>,
}

impl App {
    /// Crée l'application à partir du résultat du SessionGate
    pub fn new(store: SessionStore, gate: GateOutcome, search_debounce: Duration) -> Self {
        let (screen, session) = match gate {
            GateOutcome::Authenticated(session) => (Screen::Portfolio, Some(session)),
            GateOutcome::Unauthenticated => (Screen::Login, None),
        };

        Self {
            running: true,
            confirm_quit: false,
            confirm_delete: false,
            screen,
            login: LoginForm::from_store(&store),
            store,
            session,
            summary: None,
            caption: "",
            funds: Vec::new(),
            selected_row: 0,
            selected_fund_index: 0,
            form: None,
            chart_modal: None,
            charts: ChartHost::new(),
            search: FundSearch::new(search_debounce),
            selected_fund: None,
            message: None,
            pending_navigation: None,
            loading: None,
        }
    }

    /// Commandes à envoyer au démarrage
    pub fn startup_commands(&mut self) -> Vec<Command> {
        if self.screen == Screen::Portfolio {
            self.loading = Some("Loading portfolio...".to_string());
            vec![Command::Calculate { announce: false }]
        } else {
            Vec::new()
        }
    }

    // ========================================================================
    // Accesseurs
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.username.as_str())
    }

    pub fn summary(&self) -> Option<&PortfolioSummary> {
        self.summary.as_ref()
    }

    pub fn caption(&self) -> &'static str {
        self.caption
    }

    pub fn funds(&self) -> &[FundHolding] {
        &self.funds
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn selected_fund_index(&self) -> usize {
        self.selected_fund_index
    }

    pub fn form(&self) -> Option<&FundForm> {
        self.form.as_ref()
    }

    pub fn chart_modal(&self) -> Option<&ChartModal> {
        self.chart_modal.as_ref()
    }

    pub fn charts(&self) -> &ChartHost {
        &self.charts
    }

    pub fn search(&self) -> &FundSearch {
        &self.search
    }

    pub fn selected_fund(&self) -> Option<&FundSelection> {
        self.selected_fund.as_ref()
    }

    pub fn login(&self) -> &LoginForm {
        &self.login
    }

    pub fn login_mut(&mut self) -> &mut LoginForm {
        &mut self.login
    }

    pub fn message(&self) -> Option<&Flash> {
        self.message.as_ref()
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn pending_navigation(&self) -> Option<Navigation> {
        self.pending_navigation.map(|(nav, _)| nav)
    }

    pub fn has_modal(&self) -> bool {
        self.form.is_some() || self.chart_modal.is_some()
    }

    // ========================================================================
    // Quit / delete : confirmation en deux temps
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        if !self.funds.is_empty() {
            self.confirm_delete = true;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Seconde pression de 'd' : supprime la position sélectionnée
    pub fn confirm_delete(&mut self) -> Option<Command> {
        self.confirm_delete = false;
        let holding = self.funds.get(self.selected_fund_index)?;
        info!(id = holding.id, fund = %holding.fund_code, "User confirmed delete");
        Some(Command::DeleteFund { id: holding.id })
    }

    // ========================================================================
    // Messages
    // ========================================================================

    pub fn show_message(&mut self, text: impl Into<String>, kind: MessageKind, now: Instant) {
        self.message = Some(Flash {
            text: text.into(),
            kind,
            expires_at: now + MESSAGE_TTL,
        });
    }

    /// Point d'entrée unique des erreurs remontées par une action
    ///
    /// AuthExpired déclenche la redirection (une seule fois) ;
    /// toutes les autres erreurs deviennent un message transitoire.
    pub fn report_error(&mut self, error: &ClientError, now: Instant) {
        if error.is_auth_expired() {
            self.handle_auth_expired(now);
        } else {
            warn!(error = %error, "Action failed");
            self.show_message(error.to_string(), MessageKind::Error, now);
        }
    }

    fn handle_auth_expired(&mut self, now: Instant) {
        let already_redirecting = self.screen == Screen::Login
            || self.pending_navigation.map(|(nav, _)| nav) == Some(Navigation::ToLogin);
        if already_redirecting {
            debug!("Auth failure already handled");
            return;
        }

        info!("Session expired, redirecting to login");
        self.session = None;
        self.loading = None;
        self.show_message(ClientError::AuthExpired.to_string(), MessageKind::Error, now);
        self.pending_navigation = Some((Navigation::ToLogin, now + AUTH_REDIRECT_DELAY));
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn navigate_up(&mut self) {
        match self.screen {
            Screen::Portfolio => self.selected_row = self.selected_row.saturating_sub(1),
            Screen::FundsList => self.selected_fund_index = self.selected_fund_index.saturating_sub(1),
            Screen::Login => {}
        }
    }

    pub fn navigate_down(&mut self) {
        match self.screen {
            Screen::Portfolio => {
                let len = self.summary.as_ref().map(|s| s.fund_details.len()).unwrap_or(0);
                self.selected_row = (self.selected_row + 1).min(len.saturating_sub(1));
            }
            Screen::FundsList => {
                let max_index = self.funds.len().saturating_sub(1);
                self.selected_fund_index = (self.selected_fund_index + 1).min(max_index);
            }
            Screen::Login => {}
        }
    }

    /// Portefeuille -> liste des positions
    pub fn show_funds_list(&mut self) -> Command {
        self.screen = Screen::FundsList;
        self.confirm_delete = false;
        self.loading = Some("Loading funds...".to_string());
        Command::LoadFunds
    }

    /// Liste -> portefeuille (recalcul)
    pub fn show_portfolio(&mut self) -> Command {
        self.screen = Screen::Portfolio;
        self.confirm_delete = false;
        self.loading = Some("Loading portfolio...".to_string());
        Command::Calculate { announce: false }
    }

    /// Rafraîchissement manuel avec messages de progression
    pub fn refresh(&mut self, now: Instant) -> Command {
        self.show_message("Refreshing fund data, please wait...", MessageKind::Info, now);
        self.loading = Some("Refreshing...".to_string());
        Command::Calculate { announce: true }
    }

    /// Déconnexion : efface la session, retour au login après 200 ms
    pub fn logout(&mut self, now: Instant) {
        info!(user = ?self.username(), "User logged out");
        SessionGate::clear(&self.store);
        self.session = None;
        self.close_form();
        self.close_chart();
        self.pending_navigation = Some((Navigation::ToLogin, now + LOGOUT_DELAY));
    }

    fn enter_login_screen(&mut self) {
        self.screen = Screen::Login;
        self.session = None;
        self.summary = None;
        self.caption = "";
        self.funds.clear();
        self.selected_row = 0;
        self.selected_fund_index = 0;
        self.confirm_delete = false;
        self.loading = None;
        self.form = None;
        self.chart_modal = None;
        self.dispose_modal_state();
        self.login = LoginForm::from_store(&self.store);
    }

    // ========================================================================
    // Connexion
    // ========================================================================

    /// Soumet le formulaire de connexion
    pub fn submit_login(&mut self, now: Instant) -> Option<Command> {
        if self.login.submitting {
            return None;
        }

        if self.login.username.trim().is_empty() || self.login.password.is_empty() {
            self.set_login_error("Please enter username and password", now);
            return None;
        }

        self.login.submitting = true;
        self.login.error = None;
        Some(Command::Login {
            username: self.login.username.trim().to_string(),
            password: self.login.password.clone(),
            remember: self.login.remember,
        })
    }

    fn set_login_error(&mut self, text: impl Into<String>, now: Instant) {
        self.login.error = Some(Flash {
            text: text.into(),
            kind: MessageKind::Error,
            expires_at: now + LOGIN_ERROR_TTL,
        });
    }

    // ========================================================================
    // Formulaire de fonds (modal "normal")
    // ========================================================================

    pub fn open_add_form(&mut self) {
        self.search.reset();
        self.selected_fund = None;
        self.form = Some(FundForm::add());
    }

    /// Édite la position sélectionnée dans la liste
    pub fn open_edit_form(&mut self) {
        if let Some(holding) = self.funds.get(self.selected_fund_index) {
            self.search.reset();
            self.selected_fund = None;
            self.form = Some(FundForm::edit(holding));
        }
    }

    pub fn close_form(&mut self) {
        if self.form.take().is_some() {
            self.dispose_modal_state();
        }
    }

    pub fn form_next_field(&mut self) {
        if let Some(form) = &mut self.form {
            form.step_focus(true);
        }
    }

    pub fn form_previous_field(&mut self) {
        if let Some(form) = &mut self.form {
            form.step_focus(false);
        }
    }

    pub fn form_append_char(&mut self, c: char, now: Instant) {
        let Some(form) = &mut self.form else {
            return;
        };
        if form.focus != FormField::Search && !(c.is_ascii_digit() || c == '.') {
            return;
        }
        form.input_mut().push(c);
        self.after_form_edit(now);
    }

    pub fn form_backspace(&mut self, now: Instant) {
        let Some(form) = &mut self.form else {
            return;
        };
        form.input_mut().pop();
        self.after_form_edit(now);
    }

    fn after_form_edit(&mut self, now: Instant) {
        let Some(form) = &self.form else {
            return;
        };
        if form.focus == FormField::Search {
            // Le texte ne correspond plus au fonds choisi
            self.selected_fund = None;
            let keyword = form.search_input.clone();
            self.search.on_input(&keyword, now);
        }
    }

    pub fn search_highlight_next(&mut self) {
        self.search.highlight_next();
    }

    pub fn search_highlight_previous(&mut self) {
        self.search.highlight_previous();
    }

    /// Entrée dans le formulaire : choisit un résultat ou soumet
    pub fn form_enter(&mut self, now: Instant) -> Option<Command> {
        let on_search = self.form.as_ref().map(|f| f.focus) == Some(FormField::Search);
        if on_search && self.search.highlighted().is_some() {
            self.select_highlighted_result(now);
            return None;
        }
        self.submit_form(now)
    }

    /// Sélectionne le résultat en surbrillance
    pub fn select_highlighted_result(&mut self, now: Instant) {
        let Some(result) = self.search.highlighted() else {
            return;
        };
        let selection = FundSelection::from(result);

        if let Some(form) = &mut self.form {
            form.search_input = selection.fund_name.clone();
            form.focus = FormField::CostPrice;
        }
        self.search.hide_results();
        self.show_message(
            format!("Selected: {} ({})", selection.fund_name, selection.fund_code),
            MessageKind::Info,
            now,
        );
        self.selected_fund = Some(selection);
    }

    /// Valide et construit la requête ; aucune Command si invalide
    pub fn submit_form(&mut self, now: Instant) -> Option<Command> {
        let form = self.form.as_ref()?;

        let command = match &form.mode {
            FormMode::Add => match &self.selected_fund {
                None => Err(ClientError::validation("Please select a fund first")),
                Some(selection) => parse_cost_price(&form.cost_price).and_then(|cost_price| {
                    Ok(Command::AddFund(NewHolding {
                        fund_code: selection.fund_code.clone(),
                        fund_name: selection.fund_name.clone(),
                        cost_price,
                        shares: parse_shares(&form.shares)?,
                    }))
                }),
            },
            FormMode::Edit { id, fund_code, .. } => parse_cost_price(&form.cost_price).and_then(|cost_price| {
                Ok(Command::UpdateFund {
                    id: *id,
                    update: HoldingUpdate {
                        fund_code: fund_code.clone(),
                        cost_price,
                        shares: parse_shares(&form.shares)?,
                    },
                })
            }),
        };

        match command {
            Ok(command) => Some(command),
            Err(e) => {
                self.report_error(&e, now);
                None
            }
        }
    }

    // ========================================================================
    // Graphique de tendance (modal "chart")
    // ========================================================================

    /// Ouvre la tendance du fonds sélectionné dans le tableau
    pub fn open_trend_chart(&mut self, now: Instant) {
        let code = self
            .summary
            .as_ref()
            .and_then(|s| s.fund_details.get(self.selected_row))
            .map(|f| f.fund_code.clone());

        match code {
            Some(code) => self.open_trend_chart_for(&code, now),
            None => self.show_message(
                "Unable to get fund data, please refresh and try again",
                MessageKind::Error,
                now,
            ),
        }
    }

    /// Cherche le fonds par code dans le résumé courant et ouvre le graphe
    pub fn open_trend_chart_for(&mut self, fund_code: &str, now: Instant) {
        let Some(summary) = &self.summary else {
            self.show_message(
                "Unable to get fund data, please refresh and try again",
                MessageKind::Error,
                now,
            );
            return;
        };

        let Some(fund) = summary.find_fund(fund_code) else {
            self.show_message(format!("No data found for fund {}", fund_code), MessageKind::Error, now);
            return;
        };

        if !fund.has_trend_data() {
            self.show_message("No trend data for this fund", MessageKind::Info, now);
            return;
        }

        let error = self
            .charts
            .open(&fund.fund_code, &fund.fund_name, &fund.recent_changes)
            .err()
            .map(|e| e.to_string());

        self.chart_modal = Some(ChartModal {
            fund_code: fund.fund_code.clone(),
            fund_name: fund.fund_name.clone(),
            error,
        });
    }

    pub fn close_chart(&mut self) {
        if self.chart_modal.take().is_some() {
            self.dispose_modal_state();
        }
    }

    /// Commun aux deux modals : détruit le graphe et oublie la sélection
    fn dispose_modal_state(&mut self) {
        self.charts.dispose();
        self.selected_fund = None;
        self.search.reset();
    }

    // ========================================================================
    // Résumé
    // ========================================================================

    /// Remplace le résumé en bloc et retire une légende
    pub fn set_summary<R: Rng + ?Sized>(&mut self, summary: PortfolioSummary, rng: &mut R) {
        self.caption = pick_caption(summary.is_today_positive(), rng);
        let rows = summary.fund_details.len();
        self.summary = Some(summary);
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
    }

    fn set_funds(&mut self, funds: Vec<FundHolding>) {
        self.selected_fund_index = self.selected_fund_index.min(funds.len().saturating_sub(1));
        self.funds = funds;
    }

    /// Recalcul + rechargement de la liste si elle est affichée
    fn after_mutation(&self) -> Vec<Command> {
        let mut commands = vec![Command::Calculate { announce: false }];
        if self.screen == Screen::FundsList {
            commands.push(Command::LoadFunds);
        }
        commands
    }

    // ========================================================================
    // Résultats du worker
    // ========================================================================

    /// Applique un résultat ; retourne les commandes de suivi
    pub fn apply<R: Rng + ?Sized>(&mut self, outcome: Outcome, now: Instant, rng: &mut R) -> Vec<Command> {
        match outcome {
            Outcome::LoggedIn(result) => {
                match result {
                    // submitting reste vrai jusqu'à la redirection
                    Ok(session) => {
                        self.session = Some(session);
                        self.show_message("Login successful, redirecting...", MessageKind::Success, now);
                        self.pending_navigation = Some((Navigation::ToPortfolio, now + LOGIN_REDIRECT_DELAY));
                    }
                    Err(e) => {
                        self.login.submitting = false;
                        self.set_login_error(login_error_message(&e), now);
                    }
                }
                Vec::new()
            }

            // Résultats arrivés après une expiration : ignorés
            _ if self.screen == Screen::Login && self.pending_navigation.is_none() => {
                debug!("Ignoring late outcome on login screen");
                Vec::new()
            }

            Outcome::PortfolioCalculated { announce, result } => {
                self.loading = None;
                match result {
                    Ok(summary) => {
                        self.set_summary(summary, rng);
                        if announce {
                            self.show_message("Portfolio refreshed!", MessageKind::Success, now);
                        }
                    }
                    Err(e) if e.has_status(404) => {
                        self.set_summary(PortfolioSummary::empty(), rng);
                        self.show_message("No fund data yet, add a fund first", MessageKind::Error, now);
                    }
                    Err(e) => self.report_error(&e, now),
                }
                Vec::new()
            }

            Outcome::FundsLoaded(result) => {
                self.loading = None;
                match result {
                    Ok(funds) => self.set_funds(funds),
                    Err(e) => self.report_error(&e, now),
                }
                Vec::new()
            }

            Outcome::FundAdded(result) => self.after_write(result.map(|_| ()), "Fund added!", now),
            Outcome::FundUpdated(result) => self.after_write(result.map(|_| ()), "Fund updated!", now),

            Outcome::FundDeleted { id, result } => match result {
                Ok(()) => {
                    info!(id, "Fund deleted");
                    self.show_message("Fund deleted!", MessageKind::Success, now);
                    self.after_mutation()
                }
                Err(e) => {
                    self.report_error(&e, now);
                    Vec::new()
                }
            },

            Outcome::SearchFinished { token, result } => {
                if let Err(e) = &result {
                    if e.is_auth_expired() {
                        self.handle_auth_expired(now);
                        return Vec::new();
                    }
                }
                if self.form.is_none() {
                    return Vec::new();
                }
                let offline = matches!(&result, Ok((results, SearchSource::LocalFallback)) if !results.is_empty());
                if self.search.apply(token, result) && offline {
                    self.show_message(
                        "Backend search unavailable, showing offline list",
                        MessageKind::Info,
                        now,
                    );
                }
                Vec::new()
            }
        }
    }

    fn after_write(&mut self, result: Result<(), ClientError>, success: &str, now: Instant) -> Vec<Command> {
        match result {
            Ok(()) => {
                self.show_message(success, MessageKind::Success, now);
                self.close_form();
                self.after_mutation()
            }
            Err(e) => {
                self.report_error(&e, now);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Appelé à chaque itération de la boucle : expirations, navigation
    /// différée, recherche due
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();

        if self.message.as_ref().is_some_and(|m| now >= m.expires_at) {
            self.message = None;
        }
        if self.login.error.as_ref().is_some_and(|e| now >= e.expires_at) {
            self.login.error = None;
        }

        if let Some((navigation, due)) = self.pending_navigation {
            if now >= due {
                self.pending_navigation = None;
                match navigation {
                    Navigation::ToLogin => self.enter_login_screen(),
                    Navigation::ToPortfolio => {
                        self.login.password.clear();
                        self.login.submitting = false;
                        commands.push(self.show_portfolio());
                    }
                }
            }
        }

        if self.form.is_some() {
            if let Some(ticket) = self.search.poll(now) {
                commands.push(Command::Search {
                    token: ticket.token,
                    keyword: ticket.keyword,
                });
            }
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::{FundDetail, RecentChange, SearchResult};
    use crate::session::KEY_TOKEN;
    use crate::ui::portfolio::{NEGATIVE_CAPTIONS, POSITIVE_CAPTIONS};

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn logged_in_app() -> App {
        let store = SessionStore::in_memory();
        let session = Session::new("tok".to_string(), "alice".to_string(), Utc::now());
        store.save_session(&session).unwrap();
        App::new(store, GateOutcome::Authenticated(session), DEBOUNCE)
    }

    fn detail(code: &str, changes: Vec<RecentChange>) -> FundDetail {
        FundDetail {
            fund_code: code.to_string(),
            fund_name: format!("Fund {}", code),
            recent_changes: changes,
            ..FundDetail::default()
        }
    }

    fn trend() -> Vec<RecentChange> {
        vec![
            RecentChange {
                date: "2024-03-06".to_string(),
                unit_nav: 1.2,
                daily_growth: "0.5%".to_string(),
                daily_growth_value: 0.5,
            },
            RecentChange {
                date: "2024-03-05".to_string(),
                unit_nav: 1.19,
                daily_growth: "-0.1%".to_string(),
                daily_growth_value: -0.1,
            },
        ]
    }

    fn summary_with(today_revenue: f64, details: Vec<FundDetail>) -> PortfolioSummary {
        PortfolioSummary {
            today_revenue,
            fund_details: details,
            ..PortfolioSummary::default()
        }
    }

    #[test]
    fn test_startup_routes() {
        let mut app = logged_in_app();
        assert_eq!(app.screen(), Screen::Portfolio);
        assert_eq!(app.username(), Some("alice"));
        assert_eq!(app.startup_commands(), vec![Command::Calculate { announce: false }]);

        let mut anonymous = App::new(SessionStore::in_memory(), GateOutcome::Unauthenticated, DEBOUNCE);
        assert_eq!(anonymous.screen(), Screen::Login);
        assert!(anonymous.startup_commands().is_empty());
    }

    #[test]
    fn test_negative_revenue_picks_negative_caption() {
        let mut app = logged_in_app();
        let mut rng = rng();
        let now = Instant::now();

        for _ in 0..20 {
            app.apply(
                Outcome::PortfolioCalculated {
                    announce: false,
                    result: Ok(summary_with(-5.0, Vec::new())),
                },
                now,
                &mut rng,
            );
            assert!(NEGATIVE_CAPTIONS.contains(&app.caption()));
            assert!(!POSITIVE_CAPTIONS.contains(&app.caption()));
        }
    }

    #[test]
    fn test_summary_is_replaced_wholesale() {
        let mut app = logged_in_app();
        let mut rng = rng();
        let now = Instant::now();

        app.set_summary(summary_with(1.0, vec![detail("A", trend()), detail("B", trend())]), &mut rng);
        app.navigate_down();
        assert_eq!(app.selected_row(), 1);

        app.set_summary(summary_with(2.0, vec![detail("C", Vec::new())]), &mut rng);
        let summary = app.summary().unwrap();
        assert_eq!(summary.fund_details.len(), 1);
        assert!(summary.find_fund("A").is_none());
        assert_eq!(app.selected_row(), 0);

        app.apply(
            Outcome::PortfolioCalculated {
                announce: true,
                result: Ok(summary_with(3.0, Vec::new())),
            },
            now,
            &mut rng,
        );
        assert_eq!(app.message().unwrap().text, "Portfolio refreshed!");
    }

    #[test]
    fn test_404_renders_empty_summary() {
        let mut app = logged_in_app();
        app.apply(
            Outcome::PortfolioCalculated {
                announce: false,
                result: Err(ClientError::Server {
                    status: 404,
                    detail: "No funds found".to_string(),
                }),
            },
            Instant::now(),
            &mut rng(),
        );

        assert_eq!(app.summary(), Some(&PortfolioSummary::empty()));
        assert_eq!(app.message().unwrap().kind, MessageKind::Error);
    }

    #[test]
    fn test_auth_expired_redirects_once() {
        let mut app = logged_in_app();
        let now = Instant::now();
        let mut rng = rng();

        let expired = || Outcome::FundsLoaded(Err(ClientError::AuthExpired));
        app.apply(expired(), now, &mut rng);
        let first_message = app.message().cloned();
        app.apply(expired(), now + Duration::from_millis(100), &mut rng);

        // Le second échec ne relance ni message ni délai
        assert_eq!(app.message().cloned(), first_message);
        assert_eq!(app.pending_navigation(), Some(Navigation::ToLogin));
        assert!(app.session().is_none());

        assert!(app.tick(now + Duration::from_millis(499)).is_empty());
        assert_eq!(app.screen(), Screen::Portfolio);
        app.tick(now + AUTH_REDIRECT_DELAY);
        assert_eq!(app.screen(), Screen::Login);
        assert!(app.summary().is_none());
    }

    #[test]
    fn test_logout_clears_store_and_redirects_after_delay() {
        let mut app = logged_in_app();
        let now = Instant::now();

        app.logout(now);
        assert!(app.store.get(KEY_TOKEN).is_none());
        app.tick(now + Duration::from_millis(100));
        assert_eq!(app.screen(), Screen::Portfolio);
        app.tick(now + LOGOUT_DELAY);
        assert_eq!(app.screen(), Screen::Login);
    }

    #[test]
    fn test_login_flow() {
        let mut app = App::new(SessionStore::in_memory(), GateOutcome::Unauthenticated, DEBOUNCE);
        let now = Instant::now();

        assert!(app.submit_login(now).is_none());
        assert!(app.login().error().is_some());

        "alice".chars().for_each(|c| app.login_mut().append_char(c));
        app.login_mut().next_field();
        "pw".chars().for_each(|c| app.login_mut().append_char(c));

        let command = app.submit_login(now).unwrap();
        assert!(matches!(command, Command::Login { ref username, .. } if username == "alice"));
        // Pas de double soumission
        assert!(app.submit_login(now).is_none());

        let session = Session::new("jwt".to_string(), "alice".to_string(), Utc::now());
        app.apply(Outcome::LoggedIn(Ok(session)), now, &mut rng());
        assert_eq!(app.screen(), Screen::Login);

        let commands = app.tick(now + LOGIN_REDIRECT_DELAY);
        assert_eq!(app.screen(), Screen::Portfolio);
        assert_eq!(commands, vec![Command::Calculate { announce: false }]);
    }

    #[test]
    fn test_login_failure_shows_inline_error() {
        let mut app = App::new(SessionStore::in_memory(), GateOutcome::Unauthenticated, DEBOUNCE);
        let now = Instant::now();
        app.apply(
            Outcome::LoggedIn(Err(ClientError::Network("refused".to_string()))),
            now,
            &mut rng(),
        );

        assert_eq!(
            app.login().error(),
            Some("Login request failed, please check your network connection")
        );
        app.tick(now + LOGIN_ERROR_TTL);
        assert!(app.login().error().is_none());
    }

    #[test]
    fn test_add_without_selection_is_rejected_locally() {
        let mut app = logged_in_app();
        let now = Instant::now();

        app.open_add_form();
        app.form_next_field();
        "1.2345".chars().for_each(|c| app.form_append_char(c, now));
        app.form_next_field();
        "1000".chars().for_each(|c| app.form_append_char(c, now));

        assert!(app.submit_form(now).is_none());
        assert_eq!(app.message().unwrap().text, "Please select a fund first");
    }

    #[test]
    fn test_search_select_and_submit() {
        let mut app = logged_in_app();
        let t0 = Instant::now();
        let mut rng = rng();

        app.open_add_form();
        app.form_append_char('h', t0);
        assert!(app.tick(t0 + DEBOUNCE).is_empty());

        app.form_append_char('u', t0 + Duration::from_millis(10));
        let commands = app.tick(t0 + Duration::from_millis(310));
        let token = match commands.as_slice() {
            [Command::Search { token, keyword }] => {
                assert_eq!(keyword, "hu");
                *token
            }
            other => panic!("expected one search, got {:?}", other),
        };

        app.apply(
            Outcome::SearchFinished {
                token,
                result: Ok((
                    vec![SearchResult::new("000001", "Hua Xia Growth", None)],
                    SearchSource::Remote,
                )),
            },
            t0,
            &mut rng,
        );
        assert_eq!(app.search().results().len(), 1);

        assert!(app.form_enter(t0).is_none());
        assert_eq!(app.selected_fund().unwrap().fund_code, "000001");
        assert_eq!(app.form().unwrap().focus, FormField::CostPrice);

        "1.2345".chars().for_each(|c| app.form_append_char(c, t0));
        app.form_next_field();
        "1000".chars().for_each(|c| app.form_append_char(c, t0));

        match app.form_enter(t0) {
            Some(Command::AddFund(fund)) => {
                assert_eq!(fund.fund_code, "000001");
                assert_eq!(fund.fund_name, "Hua Xia Growth");
                assert_eq!(fund.cost_price, 1.2345);
                assert_eq!(fund.shares, 1000.0);
            }
            other => panic!("expected AddFund, got {:?}", other),
        }

        let follow_up = app.apply(
            Outcome::FundAdded(Ok(FundHolding {
                id: 1,
                fund_code: "000001".to_string(),
                fund_name: Some("Hua Xia Growth".to_string()),
                cost_price: 1.2345,
                shares: 1000.0,
            })),
            t0,
            &mut rng,
        );
        assert!(app.form().is_none());
        assert!(app.selected_fund().is_none());
        assert_eq!(follow_up, vec![Command::Calculate { announce: false }]);
    }

    #[test]
    fn test_offline_results_are_flagged() {
        let mut app = logged_in_app();
        let t0 = Instant::now();
        app.open_add_form();
        "11".chars().for_each(|c| app.form_append_char(c, t0));
        let token = match app.tick(t0 + DEBOUNCE).pop() {
            Some(Command::Search { token, .. }) => token,
            other => panic!("expected search, got {:?}", other),
        };

        app.apply(
            Outcome::SearchFinished {
                token,
                result: Ok((crate::search::local_fallback("11"), SearchSource::LocalFallback)),
            },
            t0,
            &mut rng(),
        );
        assert_eq!(app.search().source(), SearchSource::LocalFallback);
        assert_eq!(
            app.message().unwrap().text,
            "Backend search unavailable, showing offline list"
        );
    }

    #[test]
    fn test_edit_form_builds_update() {
        let mut app = logged_in_app();
        let now = Instant::now();
        app.show_funds_list();
        app.apply(
            Outcome::FundsLoaded(Ok(vec![FundHolding {
                id: 5,
                fund_code: "110011".to_string(),
                fund_name: None,
                cost_price: 2.0,
                shares: 10.0,
            }])),
            now,
            &mut rng(),
        );

        app.open_edit_form();
        app.form_backspace(now);
        app.form_backspace(now);
        app.form_backspace(now);
        "2.5".chars().for_each(|c| app.form_append_char(c, now));

        match app.submit_form(now) {
            Some(Command::UpdateFund { id, update }) => {
                assert_eq!(id, 5);
                assert_eq!(update.fund_code, "110011");
                assert_eq!(update.cost_price, 2.5);
                assert_eq!(update.shares, 10.0);
            }
            other => panic!("expected UpdateFund, got {:?}", other),
        }

        let follow_up = app.apply(Outcome::FundUpdated(Err(ClientError::validation("bad"))), now, &mut rng());
        assert!(follow_up.is_empty());
        assert!(app.form().is_some());
    }

    #[test]
    fn test_delete_two_step_and_list_reload() {
        let mut app = logged_in_app();
        let now = Instant::now();
        app.show_funds_list();
        app.apply(
            Outcome::FundsLoaded(Ok(vec![FundHolding {
                id: 3,
                fund_code: "000001".to_string(),
                fund_name: None,
                cost_price: 1.0,
                shares: 1.0,
            }])),
            now,
            &mut rng(),
        );

        app.request_delete();
        assert!(app.is_awaiting_delete_confirmation());
        assert_eq!(app.confirm_delete(), Some(Command::DeleteFund { id: 3 }));

        let follow_up = app.apply(Outcome::FundDeleted { id: 3, result: Ok(()) }, now, &mut rng());
        assert_eq!(follow_up, vec![Command::Calculate { announce: false }, Command::LoadFunds]);
    }

    #[test]
    fn test_trend_modal_lifecycle() {
        let mut app = logged_in_app();
        let now = Instant::now();
        app.set_summary(summary_with(1.0, vec![detail("A", trend()), detail("B", Vec::new())]), &mut rng());

        app.open_trend_chart(now);
        app.open_trend_chart(now);
        assert_eq!(app.charts().live_count(), 1);
        assert_eq!(app.chart_modal().unwrap().fund_code, "A");
        assert!(app.chart_modal().unwrap().error.is_none());

        app.close_chart();
        assert!(app.chart_modal().is_none());
        assert_eq!(app.charts().live_count(), 0);

        // Pas de tendance : message, pas de modal
        app.navigate_down();
        app.open_trend_chart(now);
        assert!(app.chart_modal().is_none());
        assert_eq!(app.message().unwrap().text, "No trend data for this fund");
    }

    #[test]
    fn test_chart_and_form_slots_are_distinct() {
        let mut app = logged_in_app();
        let now = Instant::now();
        app.set_summary(summary_with(1.0, vec![detail("A", trend())]), &mut rng());

        app.open_add_form();
        app.open_trend_chart(now);
        assert!(app.form().is_some());
        assert!(app.chart_modal().is_some());

        app.close_chart();
        assert!(app.form().is_some());
        assert!(app.chart_modal().is_none());
        assert_eq!(app.charts().live_count(), 0);
    }

    #[test]
    fn test_message_expires() {
        let mut app = logged_in_app();
        let now = Instant::now();
        app.show_message("hello", MessageKind::Info, now);
        app.tick(now + Duration::from_secs(2));
        assert!(app.message().is_some());
        app.tick(now + MESSAGE_TTL);
        assert!(app.message().is_none());
    }
}
