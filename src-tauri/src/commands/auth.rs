//! Sign-in, sign-out and session restoration.

use chrono::Utc;
use tauri::State;
use tracing::{info, warn};

use crate::config;
use crate::error::RedeemDeskError;
use crate::identity::{store, IdentityClient, SessionState, SessionUser};
use crate::redemption::RosterCache;
use crate::scan::ScanSession;

#[tauri::command]
pub async fn sign_in(
    session: State<'_, SessionState>,
    email: String,
    password: String,
) -> Result<SessionUser, String> {
    let email = email.trim().to_string();
    info!("sign_in called for: {}", email);

    let api_key = config::identity_api_key()?;
    let client = IdentityClient::new(&api_key)?;
    let signed_in = client.sign_in(&email, &password).await?;

    if let Err(e) = store::persist(&signed_in) {
        warn!("Session will not survive a restart: {}", e);
    }
    let user = signed_in.user();
    session.set(signed_in);
    info!("Signed in as {}", user.uid);
    Ok(user)
}

#[tauri::command]
pub fn sign_out(
    session: State<'_, SessionState>,
    roster: State<'_, RosterCache>,
    scan: State<'_, ScanSession>,
) -> Result<(), String> {
    info!("sign_out called");
    session.clear();
    roster.clear();
    scan.end_session();
    store::forget()
}

/// Resolve the current user, restoring or refreshing the session when
/// needed. Any failure to restore resolves to signed out.
#[tauri::command]
pub async fn current_session(session: State<'_, SessionState>) -> Result<Option<SessionUser>, String> {
    let (refresh_token, email) = match session.snapshot() {
        Some(current) if !current.is_expired_at(Utc::now()) => return Ok(Some(current.user())),
        Some(expired) => (expired.refresh_token, expired.email),
        None => match store::load_persisted() {
            Some(persisted) => (persisted.refresh_token, persisted.email),
            None => return Ok(None),
        },
    };

    let refreshed = match config::identity_api_key().and_then(|key| IdentityClient::new(&key)) {
        Ok(client) => client.refresh(&refresh_token, email).await,
        Err(e) => Err(e),
    };

    match refreshed {
        Ok(fresh) => {
            if let Err(e) = store::persist(&fresh) {
                warn!("Failed to persist refreshed session: {}", e);
            }
            let user = fresh.user();
            session.set(fresh);
            info!("Restored session for {}", user.uid);
            Ok(Some(user))
        }
        Err(RedeemDeskError::IdentityUnavailable(e)) => {
            // Keep the stored token; the next launch can try again
            warn!("Could not reach identity provider: {}", e);
            session.clear();
            Ok(None)
        }
        Err(e) => {
            warn!("Could not restore session: {}", e);
            session.clear();
            let _ = store::forget();
            Ok(None)
        }
    }
}
