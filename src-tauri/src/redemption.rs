//! Verification and roster flows, independent of transport.
//!
//! Each flow issues at most one request per call and never retries; every
//! error is terminal for the attempt and is reported as text.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{RedemptionBackend, RosterEntry};
use crate::error::RedeemDeskError;
use crate::scan::{Claim, ScanPhase, ScanSession};

/// The roster currently held for the signed-in user. Replaced wholesale on
/// every successful fetch, never merged.
#[derive(Default)]
pub struct RosterCache {
    inner: Mutex<HeldRoster>,
}

#[derive(Default)]
struct HeldRoster {
    entries: Vec<RosterEntry>,
    /// Bumped by `clear`, so a fetch started before sign-out cannot refill
    /// the cache afterwards.
    epoch: u64,
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<RosterEntry> {
        self.inner.lock().unwrap().entries.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.lock().unwrap().epoch
    }

    /// Hold `entries` if the cache has not been cleared since `epoch` was
    /// read. Returns whether they were stored.
    pub fn replace_if_current(&self, epoch: u64, entries: Vec<RosterEntry>) -> bool {
        let mut held = self.inner.lock().unwrap();
        if held.epoch != epoch {
            return false;
        }
        held.entries = entries;
        true
    }

    /// Drop the held list and invalidate fetches still in flight.
    pub fn clear(&self) {
        let mut held = self.inner.lock().unwrap();
        held.entries.clear();
        held.epoch += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }
}

/// What the dashboard learns from one verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub phase: ScanPhase,
    /// The refreshed roster, present only after a successful verification
    /// whose follow-up fetch also succeeded.
    pub roster: Option<Vec<RosterEntry>>,
    pub roster_error: Option<String>,
}

/// Check one decoded code with the redemption API.
///
/// Fails with `Unauthenticated` before any request when no user id is
/// available.
pub async fn verify<B: RedemptionBackend>(
    backend: &B,
    uid: Option<&str>,
    qr_code: &str,
) -> Result<(), RedeemDeskError> {
    let uid = uid
        .filter(|u| !u.is_empty())
        .ok_or(RedeemDeskError::Unauthenticated)?;

    match backend.verify_qr(qr_code, uid).await {
        Ok(resp) if resp.verified => {
            info!("QR code verified");
            Ok(())
        }
        Ok(resp) => {
            info!(
                "QR code rejected: {}",
                resp.error.as_deref().unwrap_or("no reason given")
            );
            Err(RedeemDeskError::NotVerified)
        }
        Err(e) => {
            warn!("Verification request failed: {}", e);
            Err(RedeemDeskError::Network)
        }
    }
}

/// Fetch the user's roster, most recent first, and hold it. The held list is
/// left untouched on failure.
pub async fn fetch_roster<B: RedemptionBackend>(
    backend: &B,
    cache: &RosterCache,
    uid: Option<&str>,
) -> Result<Vec<RosterEntry>, RedeemDeskError> {
    let uid = uid
        .filter(|u| !u.is_empty())
        .ok_or(RedeemDeskError::NotSignedIn)?;

    let epoch = cache.epoch();
    let mut entries = backend.fetch_roster(uid).await.map_err(|e| {
        warn!("Roster request failed: {}", e);
        RedeemDeskError::RosterFetch
    })?;
    entries.reverse();

    if !cache.replace_if_current(epoch, entries.clone()) {
        info!("Discarding roster fetched before sign-out");
        return Err(RedeemDeskError::NotSignedIn);
    }
    info!("Fetched {} roster entries", entries.len());
    Ok(entries)
}

fn abandon_claim(session: &ScanSession, claim: &Claim, message: String) -> VerificationReport {
    VerificationReport {
        phase: session.finish(claim, Err(message)).unwrap_or_else(|| session.phase()),
        roster: None,
        roster_error: None,
    }
}

/// Verify a claim with a backend built by `connect`. A missing user id fails
/// the claim as unauthenticated before `connect` runs; a `connect` error
/// fails it with that error.
pub async fn verify_claim<B, F>(
    connect: F,
    session: &ScanSession,
    cache: &RosterCache,
    uid: Option<&str>,
    claim: Claim,
) -> VerificationReport
where
    B: RedemptionBackend,
    F: FnOnce() -> Result<B, String>,
{
    if uid.map_or(true, str::is_empty) {
        return abandon_claim(session, &claim, RedeemDeskError::Unauthenticated.into());
    }
    match connect() {
        Ok(backend) => run_verification(&backend, session, cache, uid, claim).await,
        Err(e) => abandon_claim(session, &claim, e),
    }
}

/// Verify a claimed code, record the outcome on the scan session and, on
/// success, refresh the held roster. Nothing is recorded or fetched when the
/// session ended while the request was out.
pub async fn run_verification<B: RedemptionBackend>(
    backend: &B,
    session: &ScanSession,
    cache: &RosterCache,
    uid: Option<&str>,
    claim: Claim,
) -> VerificationReport {
    let outcome = verify(backend, uid, &claim.code).await;
    let verified = outcome.is_ok();
    let Some(phase) = session.finish(&claim, outcome.map_err(String::from)) else {
        return VerificationReport {
            phase: session.phase(),
            roster: None,
            roster_error: None,
        };
    };

    if !verified {
        return VerificationReport {
            phase,
            roster: None,
            roster_error: None,
        };
    }

    match fetch_roster(backend, cache, uid).await {
        Ok(entries) => VerificationReport {
            phase,
            roster: Some(entries),
            roster_error: None,
        },
        Err(e) => VerificationReport {
            phase,
            roster: None,
            roster_error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::VerifyResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        verify: Result<VerifyResponse, String>,
        roster: Result<Vec<RosterEntry>, String>,
        verified_codes: Mutex<Vec<String>>,
        roster_calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(verified: bool) -> Self {
            Self {
                verify: Ok(VerifyResponse {
                    verified,
                    error: None,
                }),
                roster: Ok(vec![entry("first"), entry("second")]),
                verified_codes: Mutex::new(Vec::new()),
                roster_calls: AtomicUsize::new(0),
            }
        }

        fn verify_calls(&self) -> usize {
            self.verified_codes.lock().unwrap().len()
        }
    }

    impl RedemptionBackend for FakeBackend {
        async fn verify_qr(&self, qr_code: &str, _client_uid: &str) -> Result<VerifyResponse, String> {
            self.verified_codes.lock().unwrap().push(qr_code.to_string());
            tokio::task::yield_now().await;
            self.verify.clone()
        }

        async fn fetch_roster(&self, _uid: &str) -> Result<Vec<RosterEntry>, String> {
            self.roster_calls.fetch_add(1, Ordering::SeqCst);
            self.roster.clone()
        }
    }

    /// Signs the user out while one of its requests is outstanding.
    struct SignsOutDuring<'a> {
        scan: &'a ScanSession,
        cache: &'a RosterCache,
        during_verify: bool,
        roster_calls: AtomicUsize,
    }

    impl SignsOutDuring<'_> {
        fn sign_out(&self) {
            self.cache.clear();
            self.scan.end_session();
        }
    }

    impl RedemptionBackend for SignsOutDuring<'_> {
        async fn verify_qr(&self, _qr_code: &str, _client_uid: &str) -> Result<VerifyResponse, String> {
            if self.during_verify {
                self.sign_out();
            }
            Ok(VerifyResponse {
                verified: true,
                error: None,
            })
        }

        async fn fetch_roster(&self, _uid: &str) -> Result<Vec<RosterEntry>, String> {
            self.roster_calls.fetch_add(1, Ordering::SeqCst);
            if !self.during_verify {
                self.sign_out();
            }
            Ok(vec![entry("previous user")])
        }
    }

    fn entry(name: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            college: "X".to_string(),
            product_json: "[]".to_string(),
        }
    }

    fn hold(cache: &RosterCache, entries: Vec<RosterEntry>) {
        assert!(cache.replace_if_current(cache.epoch(), entries));
    }

    fn claimed(session: &ScanSession, code: &str) -> Claim {
        session.open_camera().unwrap();
        assert!(session.claim(code.to_string()));
        session.take_claim().unwrap()
    }

    #[tokio::test]
    async fn test_verify_without_uid_makes_no_request() {
        let backend = FakeBackend::new(true);
        assert_eq!(
            verify(&backend, None, "code").await,
            Err(RedeemDeskError::Unauthenticated)
        );
        assert_eq!(
            verify(&backend, Some(""), "code").await,
            Err(RedeemDeskError::Unauthenticated)
        );
        assert_eq!(backend.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_generic() {
        let mut backend = FakeBackend::new(true);
        backend.verify = Err("API error (500 Internal Server Error)".to_string());
        let err = verify(&backend, Some("uid"), "code").await.unwrap_err();
        assert_eq!(err.to_string(), "Error verifying QR code");
    }

    #[tokio::test]
    async fn test_rejection_leaves_roster_untouched() {
        let backend = FakeBackend::new(false);
        let session = ScanSession::new();
        let cache = RosterCache::new();
        hold(&cache, vec![entry("held")]);
        let claim = claimed(&session, "code");

        let report = run_verification(&backend, &session, &cache, Some("uid"), claim).await;

        assert_eq!(report.phase, ScanPhase::Failed("QR code not verified".to_string()));
        assert!(report.roster.is_none());
        assert!(!session.phase().is_scanning());
        assert_eq!(cache.snapshot(), vec![entry("held")]);
        assert_eq!(backend.roster_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_fetches_roster_once_newest_first() {
        let backend = FakeBackend::new(true);
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let claim = claimed(&session, "code");

        let report = run_verification(&backend, &session, &cache, Some("uid"), claim).await;

        assert_eq!(report.phase, ScanPhase::Verified);
        assert_eq!(report.roster, Some(vec![entry("second"), entry("first")]));
        assert_eq!(cache.snapshot(), vec![entry("second"), entry("first")]);
        assert_eq!(backend.verify_calls(), 1);
        assert_eq!(backend.roster_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_one_decode_yields_one_verify_request() {
        let backend = FakeBackend::new(true);
        let session = ScanSession::new();
        let cache = RosterCache::new();
        session.open_camera().unwrap();
        assert!(session.claim("decoded-payload".to_string()));

        let (backend, session, cache) = (&backend, &session, &cache);
        let attempt = || async move {
            match session.take_claim() {
                Some(claim) => Some(run_verification(backend, session, cache, Some("uid"), claim).await),
                None => None,
            }
        };
        let (first, second) = tokio::join!(attempt(), attempt());

        assert_eq!(first.is_some() as usize + second.is_some() as usize, 1);
        assert_eq!(
            *backend.verified_codes.lock().unwrap(),
            vec!["decoded-payload".to_string()]
        );
        assert_eq!(session.phase(), ScanPhase::Verified);
    }

    #[tokio::test]
    async fn test_roster_failure_after_verification_is_reported() {
        let mut backend = FakeBackend::new(true);
        backend.roster = Err("API error (503 Service Unavailable)".to_string());
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let claim = claimed(&session, "code");

        let report = run_verification(&backend, &session, &cache, Some("uid"), claim).await;

        assert_eq!(report.phase, ScanPhase::Verified);
        assert!(report.roster.is_none());
        assert_eq!(report.roster_error.as_deref(), Some("Error fetching client data"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_during_verify_skips_roster() {
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let backend = SignsOutDuring {
            scan: &session,
            cache: &cache,
            during_verify: true,
            roster_calls: AtomicUsize::new(0),
        };
        let claim = claimed(&session, "code");

        let report = run_verification(&backend, &session, &cache, Some("uid"), claim).await;

        assert_eq!(report.phase, ScanPhase::Idle);
        assert!(report.roster.is_none());
        assert_eq!(backend.roster_calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
        assert_eq!(session.phase(), ScanPhase::Idle);
    }

    #[tokio::test]
    async fn test_sign_out_during_fetch_keeps_cache_empty() {
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let backend = SignsOutDuring {
            scan: &session,
            cache: &cache,
            during_verify: false,
            roster_calls: AtomicUsize::new(0),
        };

        let err = fetch_roster(&backend, &cache, Some("uid")).await.unwrap_err();

        assert_eq!(err, RedeemDeskError::NotSignedIn);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_replaces_rather_than_merges() {
        let backend = FakeBackend::new(true);
        let cache = RosterCache::new();
        hold(&cache, vec![entry("stale"), entry("older")]);

        fetch_roster(&backend, &cache, Some("uid")).await.unwrap();
        assert_eq!(cache.snapshot(), vec![entry("second"), entry("first")]);
    }

    #[tokio::test]
    async fn test_fetch_without_uid_makes_no_request() {
        let backend = FakeBackend::new(true);
        let cache = RosterCache::new();
        let err = fetch_roster(&backend, &cache, None).await.unwrap_err();
        assert_eq!(err, RedeemDeskError::NotSignedIn);
        assert_eq!(backend.roster_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signed_out_claim_fails_before_config_is_read() {
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let claim = claimed(&session, "code");
        let connected = AtomicUsize::new(0);

        let report = verify_claim(
            || -> Result<FakeBackend, String> {
                connected.fetch_add(1, Ordering::SeqCst);
                Err("Config error: Invalid API base URL".to_string())
            },
            &session,
            &cache,
            None,
            claim,
        )
        .await;

        assert_eq!(
            report.phase,
            ScanPhase::Failed("User is not authenticated. Cannot verify QR code.".to_string())
        );
        assert_eq!(connected.load(Ordering::SeqCst), 0);
        assert!(session.take_claim().is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_fails_claim() {
        let session = ScanSession::new();
        let cache = RosterCache::new();
        let claim = claimed(&session, "code");

        let report = verify_claim(
            || -> Result<FakeBackend, String> { Err("Config error: bad URL".to_string()) },
            &session,
            &cache,
            Some("uid"),
            claim,
        )
        .await;

        assert_eq!(report.phase, ScanPhase::Failed("Config error: bad URL".to_string()));
        assert!(report.roster.is_none());
    }
}
