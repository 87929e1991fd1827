//! Runtime configuration: API base URL from the preference store and the
//! identity provider's web API key from the keychain.

use keyring::Entry;
use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use tracing::warn;
use url::Url;

use crate::error::RedeemDeskError;

pub const PREFERENCES_STORE: &str = "preferences.json";
pub const API_BASE_URL_KEY: &str = "api_base_url";
pub const DEFAULT_API_BASE_URL: &str = "https://api.studentdiscountteam.workers.dev/";

/// Keychain account name shared by every RedeemDesk entry.
pub const KEYCHAIN_USER: &str = "redeemdesk";
/// Keychain service holding the identity provider's web API key.
pub const IDENTITY_API_KEY_SERVICE: &str = "redeemdesk-identity-api";

/// Parse a user-supplied base URL, forcing a trailing `/` so that
/// `Url::join` appends endpoint paths instead of replacing the last segment.
pub fn normalize_base_url(raw: &str) -> Result<Url, RedeemDeskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RedeemDeskError::Config("API base URL is empty".to_string()));
    }

    let mut url = Url::parse(trimmed)
        .map_err(|e| RedeemDeskError::Config(format!("Invalid API base URL '{}': {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RedeemDeskError::Config(format!(
            "API base URL must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve the API base URL, falling back to the default when unset.
pub fn api_base_url(app: &AppHandle) -> Result<Url, String> {
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open preferences store: {}", e);
        e.to_string()
    })?;
    let configured = store
        .get(API_BASE_URL_KEY)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    normalize_base_url(&configured).map_err(String::from)
}

/// Read the identity provider's web API key from the keychain.
pub fn identity_api_key() -> Result<String, RedeemDeskError> {
    let entry = Entry::new(IDENTITY_API_KEY_SERVICE, KEYCHAIN_USER)
        .map_err(|e| RedeemDeskError::Keychain(e.to_string()))?;
    match entry.get_password() {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) | Err(keyring::Error::NoEntry) => Err(RedeemDeskError::Config(
            "No identity API key configured. Please set it in Settings.".to_string(),
        )),
        Err(e) => Err(RedeemDeskError::Keychain(e.to_string())),
    }
}
