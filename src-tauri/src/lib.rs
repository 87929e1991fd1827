pub mod api;
mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod identity;
pub mod redemption;
pub mod scan;

pub use api::{RedemptionBackend, RosterEntry};
pub use error::RedeemDeskError;

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .manage(identity::SessionState::new())
        .manage(scan::ScanSession::new())
        .manage(redemption::RosterCache::new())
        .invoke_handler(tauri::generate_handler![
            commands::auth::sign_in,
            commands::auth::sign_out,
            commands::auth::current_session,
            commands::scan::get_scan_phase,
            commands::scan::open_camera,
            commands::scan::close_camera,
            commands::scan::reset_scan,
            commands::scan::scan_frame,
            commands::scan::verify_scan,
            commands::roster::fetch_roster,
            commands::roster::export_roster,
            commands::config::get_preference,
            commands::config::set_preference,
            commands::keychain::set_api_key,
            commands::keychain::has_api_key,
            commands::keychain::delete_api_key,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
