use tauri::AppHandle;
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::config::{normalize_base_url, API_BASE_URL_KEY, PREFERENCES_STORE};

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    let value = store.get(key).and_then(|v| v.as_str().map(|s| s.to_string()));
    Ok(value)
}

/// Save a preference. The API base URL is validated and stored normalized;
/// an empty value removes it so the default applies again.
#[tauri::command]
pub fn set_preference(app: AppHandle, key: &str, value: &str) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    let store = app.store(PREFERENCES_STORE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;

    if key == API_BASE_URL_KEY {
        if value.trim().is_empty() {
            store.delete(key);
        } else {
            let url = normalize_base_url(value)?;
            store.set(key, serde_json::json!(url.as_str()));
        }
    } else {
        store.set(key, serde_json::json!(value));
    }

    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}
