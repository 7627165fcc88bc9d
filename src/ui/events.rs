// ============================================================================
// Gestion des événements
// ============================================================================
// Lit le clavier (crossterm) et produit des Event pour l'event loop.
// Les helpers is_*_event() gardent handle_event() lisible.
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching avec guards (matches! + if)
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Intervalle de poll : assez court pour les délais de 200 ms
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Aucun événement pendant POLL_INTERVAL
    Tick,
}

/// Gestionnaire d'événements
#[derive(Debug, Default)]
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// Si rien n'arrive avant POLL_INTERVAL, retourne Event::Tick
    pub fn next(&self) -> Result<Event> {
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                // Resize : le prochain draw recalcule le layout
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        Event::Tick => None,
    }
}

/// Lettre de raccourci (insensible à la casse, sans Ctrl/Alt)
pub fn is_shortcut_event(event: &Event, letter: char) -> bool {
    match event {
        Event::Key(key) => {
            !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                && matches!(key.code, KeyCode::Char(c) if c.eq_ignore_ascii_case(&letter))
        }
        Event::Tick => false,
    }
}

/// Ctrl-C : sortie immédiate, quel que soit l'écran
pub fn is_interrupt_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
    } else {
        false
    }
}

/// Vérifie si l'événement est la touche 'q' (quitter)
pub fn is_quit_event(event: &Event) -> bool {
    is_shortcut_event(event, 'q')
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Enter))
}

pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

pub fn is_backtab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::BackTab))
}

pub fn is_backspace_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Backspace))
}

/// Flèche haut uniquement (dans les formulaires, 'k' est un caractère)
pub fn is_arrow_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up))
}

pub fn is_arrow_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down))
}

/// Flèche vers le haut ou 'k' (vim), hors saisie
pub fn is_up_event(event: &Event) -> bool {
    is_arrow_up_event(event) || is_shortcut_event(event, 'k')
}

/// Flèche vers le bas ou 'j' (vim), hors saisie
pub fn is_down_event(event: &Event) -> bool {
    is_arrow_down_event(event) || is_shortcut_event(event, 'j')
}

/// Retour à l'écran précédent : Échap ou 'b'
pub fn is_back_event(event: &Event) -> bool {
    is_escape_event(event) || is_shortcut_event(event, 'b')
}

/// Extrait le caractère saisi (ignore les combinaisons Ctrl/Alt)
pub fn get_char_from_event(event: &Event) -> Option<char> {
    match event {
        Event::Key(key) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => match key.code {
            KeyCode::Char(c) => Some(c),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(is_quit_event(&key(KeyCode::Char('Q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_ctrl_c_is_interrupt_not_char() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(is_interrupt_event(&ctrl_c));
        assert_eq!(get_char_from_event(&ctrl_c), None);
        assert!(!is_shortcut_event(&ctrl_c, 'c'));
    }

    #[test]
    fn test_vim_keys_are_not_arrows() {
        assert!(is_down_event(&key(KeyCode::Char('j'))));
        assert!(!is_arrow_down_event(&key(KeyCode::Char('j'))));
        assert_eq!(get_char_from_event(&key(KeyCode::Char('华'))), Some('华'));
    }
}
