use tauri::{AppHandle, State};
use tracing::info;

use crate::api::{RedemptionClient, RosterEntry};
use crate::config;
use crate::error::RedeemDeskError;
use crate::export;
use crate::identity::SessionState;
use crate::redemption::{self, RosterCache};

#[tauri::command]
pub async fn fetch_roster(
    app: AppHandle,
    session: State<'_, SessionState>,
    roster: State<'_, RosterCache>,
) -> Result<Vec<RosterEntry>, String> {
    info!("fetch_roster called");
    let base = config::api_base_url(&app)?;
    let client = RedemptionClient::new(&base)?;
    let uid = session.uid();
    Ok(redemption::fetch_roster(&client, &roster, uid.as_deref()).await?)
}

/// Write the full held roster to the download directory. Returns the saved
/// file's path.
#[tauri::command]
pub fn export_roster(roster: State<'_, RosterCache>) -> Result<String, String> {
    let entries = roster.snapshot();
    if entries.is_empty() {
        return Err(RedeemDeskError::Export("No client data to export".to_string()).into());
    }

    let dir = export::export_dir().ok_or_else(|| {
        RedeemDeskError::Export("Could not determine a download directory".to_string())
    })?;
    let path = export::export_roster(&entries, &dir)
        .map_err(|e| RedeemDeskError::Export(e.to_string()))?;
    Ok(path.to_string_lossy().to_string())
}
