//! Camera lifecycle and per-frame QR handling.

use tauri::{AppHandle, State};
use tracing::{debug, info, warn};

use crate::api::RedemptionClient;
use crate::config;
use crate::identity::SessionState;
use crate::redemption::{self, RosterCache, VerificationReport};
use crate::scan::{decode_frame, FrameOutcome, ScanPhase, ScanSession};

#[tauri::command]
pub fn get_scan_phase(scan: State<'_, ScanSession>) -> Result<ScanPhase, String> {
    Ok(scan.phase())
}

#[tauri::command]
pub fn open_camera(scan: State<'_, ScanSession>) -> Result<ScanPhase, String> {
    scan.open_camera()
}

#[tauri::command]
pub fn close_camera(scan: State<'_, ScanSession>) -> Result<ScanPhase, String> {
    Ok(scan.close_camera())
}

#[tauri::command]
pub fn reset_scan(scan: State<'_, ScanSession>) -> Result<ScanPhase, String> {
    Ok(scan.reset())
}

/// Decode one captured frame. A decoded code is claimed before returning,
/// so later frames are skipped until scanning is reopened.
#[tauri::command]
pub async fn scan_frame(scan: State<'_, ScanSession>, frame: String) -> Result<FrameOutcome, String> {
    if !scan.phase().is_scanning() {
        return Ok(FrameOutcome::Skipped);
    }

    let decoded = tauri::async_runtime::spawn_blocking(move || decode_frame(&frame))
        .await
        .map_err(|e| format!("Frame decoder stopped: {}", e))?;

    let code = match decoded {
        Ok(Some(code)) => code,
        Ok(None) => return Ok(FrameOutcome::NoCode),
        Err(e) => {
            debug!("Unreadable frame: {}", e);
            return Ok(FrameOutcome::NoCode);
        }
    };

    if scan.claim(code.clone()) {
        info!("QR code decoded and claimed");
        Ok(FrameOutcome::Claimed(code))
    } else {
        Ok(FrameOutcome::Skipped)
    }
}

/// Verify the code claimed by `scan_frame` and, on success, refresh the
/// roster. Each claim is verified once; later calls are refused.
#[tauri::command]
pub async fn verify_scan(
    app: AppHandle,
    session: State<'_, SessionState>,
    scan: State<'_, ScanSession>,
    roster: State<'_, RosterCache>,
) -> Result<VerificationReport, String> {
    let claim = scan
        .take_claim()
        .ok_or_else(|| "No scanned QR code is waiting for verification".to_string())?;

    let uid = session.uid();
    let connect = || {
        config::api_base_url(&app)
            .and_then(|base| RedemptionClient::new(&base))
            .map_err(|e| {
                warn!("Cannot reach redemption API: {}", e);
                e
            })
    };
    Ok(redemption::verify_claim(connect, &scan, &roster, uid.as_deref(), claim).await)
}
