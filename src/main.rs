// ============================================================================
// Fundfolio - Client terminal du suivi de portefeuille de fonds
// ============================================================================
// Programme TUI : connexion, résumé du portefeuille, gestion des positions,
// recherche de fonds et graphiques de tendance.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : résultats -> rendu -> entrée -> tick
// 3. Async dans sync : le worker thread possède son runtime tokio
// 4. App appartient à la boucle UI ; le worker ne la voit jamais
// ============================================================================

use std::io;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use fundfolio::api::{ApiClient, LoginManager};
use fundfolio::app::{App, FormField, Screen};
use fundfolio::config::{Config, APP_NAME};
use fundfolio::session::{SessionGate, SessionStore};
use fundfolio::ui::events::{
    get_char_from_event, is_arrow_down_event, is_arrow_up_event, is_back_event, is_backspace_event,
    is_backtab_event, is_down_event, is_enter_event, is_escape_event, is_interrupt_event, is_quit_event,
    is_shortcut_event, is_tab_event, is_up_event, Event, EventHandler,
};
use fundfolio::ui::render;
use fundfolio::worker::{self, Command, Services};

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier avec rotation quotidienne.
//
// # Contrôler le niveau de log
// RUST_LOG=debug fundfolio
// RUST_LOG=fundfolio=trace fundfolio
// ============================================================================

fn init_logging(config: &Config) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(&config.log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, format!("{}.log", APP_NAME));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour fundfolio, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fundfolio=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'initialisation du subscriber tracing")?;

    info!(log_dir = %config.log_dir.display(), "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let config = Config::load().context("Échec du chargement de la configuration")?;

    init_logging(&config).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(api = %config.api_root(), "Fundfolio starting up");

    // Session persistée : valide moins de 7 jours
    let store = SessionStore::open(config.session_path()).context("Échec de l'ouverture du fichier de session")?;
    let gate = SessionGate::check(&store, Utc::now());

    let services = Services {
        api: ApiClient::from_config(&config, store.clone()).context("Échec de la création du client HTTP")?,
        login: LoginManager::from_config(&config, store.clone()).context("Échec de la création du client HTTP")?,
        search_limit: config.search_limit,
    };

    let mut app = App::new(store, gate, config.search_debounce());

    let (command_tx, command_rx) = mpsc::channel::<Command>();
    let (outcome_tx, outcome_rx) = mpsc::channel();

    info!("Spawning background worker thread");
    let worker = worker::spawn(services, command_rx, outcome_tx);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &command_tx, &outcome_rx);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    // Ferme le canal : le worker termine la commande en cours puis sort
    drop(command_tx);
    if worker.join().is_err() {
        warn!("Worker thread panicked");
    }

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Résultats du worker (non bloquant)
//   1. Rendu
//   2. Entrée clavier (poll avec timeout)
//   3. Tick : expirations, navigation différée, recherche due
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    command_tx: &mpsc::Sender<Command>,
    outcome_rx: &mpsc::Receiver<worker::Outcome>,
) -> Result<()> {
    let startup = app.startup_commands();
    send_all(command_tx, startup);

    let mut rng = rand::thread_rng();

    while app.is_running() {
        // 0. RÉSULTATS
        loop {
            match outcome_rx.try_recv() {
                Ok(outcome) => {
                    let follow_up = app.apply(outcome, Instant::now(), &mut rng);
                    send_all(command_tx, follow_up);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Worker thread disconnected!");
                    break;
                }
            }
        }

        // 1. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 2. INPUT
        match events.next() {
            Ok(event) => {
                let commands = handle_event(app, &event, Instant::now());
                send_all(command_tx, commands);
            }
            Err(e) => warn!(error = %e, "Failed to read terminal event"),
        }

        // 3. UPDATE
        let commands = app.tick(Instant::now());
        send_all(command_tx, commands);
    }

    Ok(())
}

fn send_all(command_tx: &mpsc::Sender<Command>, commands: impl IntoIterator<Item = Command>) {
    for command in commands {
        if command_tx.send(command).is_err() {
            error!("Worker channel closed, command dropped");
        }
    }
}

// ============================================================================
// Gestion des événements
// ============================================================================
// Ordre de priorité :
//   Ctrl-C > modal graphique > modal formulaire > écran de connexion
//   > confirmations en attente > raccourcis de l'écran courant
// ============================================================================

fn handle_event(app: &mut App, event: &Event, now: Instant) -> Vec<Command> {
    if matches!(event, Event::Tick) {
        return Vec::new();
    }

    if is_interrupt_event(event) {
        info!("Interrupted with Ctrl-C");
        app.quit();
        return Vec::new();
    }

    if app.chart_modal().is_some() {
        if is_escape_event(event) || is_enter_event(event) || is_quit_event(event) {
            debug!("User closed trend chart");
            app.close_chart();
        }
        return Vec::new();
    }

    if app.form().is_some() {
        return handle_form_event(app, event, now).into_iter().collect();
    }

    if app.screen() == Screen::Login {
        return handle_login_event(app, event, now).into_iter().collect();
    }

    handle_screen_event(app, event, now)
}

/// Saisie dans le formulaire ajout / édition
fn handle_form_event(app: &mut App, event: &Event, now: Instant) -> Option<Command> {
    let on_search = app.form().map(|f| f.focus) == Some(FormField::Search);

    if is_escape_event(event) {
        info!("User cancelled fund form");
        app.close_form();
    } else if is_tab_event(event) {
        app.form_next_field();
    } else if is_backtab_event(event) {
        app.form_previous_field();
    } else if is_arrow_down_event(event) {
        if on_search {
            app.search_highlight_next();
        } else {
            app.form_next_field();
        }
    } else if is_arrow_up_event(event) {
        if on_search {
            app.search_highlight_previous();
        } else {
            app.form_previous_field();
        }
    } else if is_enter_event(event) {
        let command = app.form_enter(now);
        if let Some(command) = &command {
            info!(?command, "User submitted fund form");
        }
        return command;
    } else if is_backspace_event(event) {
        app.form_backspace(now);
    } else if let Some(c) = get_char_from_event(event) {
        app.form_append_char(c, now);
    }
    None
}

fn handle_login_event(app: &mut App, event: &Event, now: Instant) -> Option<Command> {
    if is_escape_event(event) {
        info!("User quit from login screen");
        app.quit();
    } else if is_tab_event(event) || is_arrow_down_event(event) {
        app.login_mut().next_field();
    } else if is_backtab_event(event) || is_arrow_up_event(event) {
        app.login_mut().previous_field();
    } else if is_enter_event(event) {
        let command = app.submit_login(now);
        if command.is_some() {
            info!(user = %app.login().username.trim(), "User submitted login");
        }
        return command;
    } else if is_backspace_event(event) {
        app.login_mut().backspace();
    } else if let Some(c) = get_char_from_event(event) {
        app.login_mut().append_char(c);
    }
    None
}

/// Raccourcis des écrans Portefeuille et Liste
fn handle_screen_event(app: &mut App, event: &Event, now: Instant) -> Vec<Command> {
    let on_portfolio = app.screen() == Screen::Portfolio;
    let on_funds = app.screen() == Screen::FundsList;

    // Quit two-step : première pression -> confirmation, seconde -> sortie
    if is_quit_event(event) {
        app.cancel_delete();
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return Vec::new();
    }

    // Toute autre touche annule la confirmation de quit
    app.cancel_quit();

    if on_funds && is_shortcut_event(event, 'd') {
        if app.is_awaiting_delete_confirmation() {
            return app.confirm_delete().into_iter().collect();
        }
        info!("User requested delete (awaiting confirmation)");
        app.request_delete();
        return Vec::new();
    }

    app.cancel_delete();

    let mut commands = Vec::new();
    if is_up_event(event) {
        app.navigate_up();
    } else if is_down_event(event) {
        app.navigate_down();
    } else if is_shortcut_event(event, 'a') {
        info!("User opened add form");
        app.open_add_form();
    } else if on_portfolio && (is_enter_event(event) || is_shortcut_event(event, 't')) {
        app.open_trend_chart(now);
    } else if on_portfolio && is_shortcut_event(event, 'r') {
        info!("User requested refresh");
        commands.push(app.refresh(now));
    } else if on_portfolio && is_shortcut_event(event, 'f') {
        commands.push(app.show_funds_list());
    } else if on_portfolio && is_shortcut_event(event, 'o') {
        app.logout(now);
    } else if on_funds && is_shortcut_event(event, 'e') {
        info!("User opened edit form");
        app.open_edit_form();
    } else if on_funds && is_back_event(event) {
        commands.push(app.show_portfolio());
    }
    commands
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Échec de l'activation du raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Échec de la création du terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
