use keyring::Entry;
use tracing::{info, warn};

use crate::config::{IDENTITY_API_KEY_SERVICE, KEYCHAIN_USER};

/// Only the identity API key may be managed from the webview; the session
/// entry holds a refresh token and stays backend-only.
fn editable_entry(service: &str) -> Result<Entry, String> {
    if service != IDENTITY_API_KEY_SERVICE {
        warn!("Rejected keychain access for service: {}", service);
        return Err(format!("Unknown key service: {}", service));
    }
    Entry::new(service, KEYCHAIN_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", service, e);
        e.to_string()
    })
}

#[tauri::command]
pub fn set_api_key(service: &str, key: &str) -> Result<(), String> {
    info!("Setting API key for service: {}", service);
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is empty".to_string());
    }
    editable_entry(service)?.set_password(key).map_err(|e| {
        warn!("Failed to set password for {}: {}", service, e);
        e.to_string()
    })
}

/// Whether a key is stored. The key itself is never returned.
#[tauri::command]
pub fn has_api_key(service: &str) -> Result<bool, String> {
    match editable_entry(service)?.get_password() {
        Ok(_) => Ok(true),
        Err(keyring::Error::NoEntry) => {
            info!("No API key found for service: {}", service);
            Ok(false)
        }
        Err(e) => {
            warn!("Failed to get password for {}: {}", service, e);
            Err(e.to_string())
        }
    }
}

#[tauri::command]
pub fn delete_api_key(service: &str) -> Result<(), String> {
    info!("Deleting API key for service: {}", service);
    match editable_entry(service)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete credential for {}: {}", service, e);
            Err(e.to_string())
        }
    }
}
