use std::sync::Mutex;

use keyring::Entry;
use tracing::{info, warn};

use super::types::{PersistedSession, Session};
use crate::config::KEYCHAIN_USER;

/// Keychain service holding the persisted refresh token.
pub const SESSION_SERVICE: &str = "redeemdesk-session";

/// The signed-in session, shared by every command.
#[derive(Default)]
pub struct SessionState {
    current: Mutex<Option<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    /// The signed-in user's id, if any. Empty ids count as signed out.
    pub fn uid(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.uid.clone())
            .filter(|uid| !uid.is_empty())
    }

    pub fn set(&self, session: Session) {
        *self.current.lock().unwrap() = Some(session);
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}

fn session_entry() -> Result<Entry, String> {
    Entry::new(SESSION_SERVICE, KEYCHAIN_USER).map_err(|e| {
        warn!("Failed to create keyring entry for session: {}", e);
        e.to_string()
    })
}

/// Store the refresh token so the next launch can restore the session.
pub fn persist(session: &Session) -> Result<(), String> {
    let json = serde_json::to_string(&session.persisted()).map_err(|e| e.to_string())?;
    session_entry()?.set_password(&json).map_err(|e| {
        warn!("Failed to persist session: {}", e);
        e.to_string()
    })
}

/// Load the persisted session, if one was stored. Unreadable entries are
/// treated as absent.
pub fn load_persisted() -> Option<PersistedSession> {
    let entry = session_entry().ok()?;
    match entry.get_password() {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(persisted) => Some(persisted),
            Err(e) => {
                warn!("Discarding unreadable persisted session: {}", e);
                None
            }
        },
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!("Failed to read persisted session: {}", e);
            None
        }
    }
}

/// Remove the persisted session. A missing entry is not an error.
pub fn forget() -> Result<(), String> {
    match session_entry()?.delete_credential() {
        Ok(()) => {
            info!("Removed persisted session");
            Ok(())
        }
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to remove persisted session: {}", e);
            Err(e.to_string())
        }
    }
}
