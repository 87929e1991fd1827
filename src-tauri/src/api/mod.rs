//! Client for the remote redemption API (QR verification and roster data).

pub mod client;
pub mod types;

use std::future::Future;

pub use client::RedemptionClient;
pub use types::{RosterEntry, VerifyResponse};

/// The two remote calls the dashboard makes.
///
/// `RedemptionClient` talks HTTP; tests substitute an in-memory fake.
/// Errors are transport-level only: a well-formed `verified: false` is an
/// `Ok` response.
pub trait RedemptionBackend {
    fn verify_qr(
        &self,
        qr_code: &str,
        client_uid: &str,
    ) -> impl Future<Output = Result<VerifyResponse, String>> + Send;

    fn fetch_roster(
        &self,
        uid: &str,
    ) -> impl Future<Output = Result<Vec<RosterEntry>, String>> + Send;
}
