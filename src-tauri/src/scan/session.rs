use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info};

/// Where the dashboard is in the scan → verify cycle.
///
/// `Idle → Scanning → Verifying → Verified | Failed → Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Scanning,
    Verifying,
    Verified,
    Failed(String),
}

impl ScanPhase {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanPhase::Scanning)
    }
}

struct ScanState {
    phase: ScanPhase,
    /// Payload decoded by the winning `claim`, until verification takes it.
    claimed: Option<String>,
    /// Bumped when the signed-in user goes away; outcomes from an older
    /// generation are dropped.
    generation: u64,
}

/// A decoded payload handed out for verification. At most one exists per
/// successful decode.
#[derive(Debug)]
pub struct Claim {
    pub code: String,
    generation: u64,
}

/// Shared scan state. Every transition happens under one lock, so the
/// claim of a decoded frame is exclusive even with several frames in flight.
pub struct ScanSession {
    state: Mutex<ScanState>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self {
            state: Mutex::new(ScanState {
                phase: ScanPhase::Idle,
                claimed: None,
                generation: 0,
            }),
        }
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ScanPhase {
        self.state.lock().unwrap().phase.clone()
    }

    /// Start scanning. Refused while a verification is in flight.
    pub fn open_camera(&self) -> Result<ScanPhase, String> {
        let mut state = self.state.lock().unwrap();
        if state.phase == ScanPhase::Verifying {
            return Err("A QR code is still being verified".to_string());
        }
        info!("Camera opened");
        state.phase = ScanPhase::Scanning;
        Ok(state.phase.clone())
    }

    /// Stop scanning without a decode. Other phases are left as they are.
    pub fn close_camera(&self) -> ScanPhase {
        let mut state = self.state.lock().unwrap();
        if state.phase.is_scanning() {
            info!("Camera closed");
            state.phase = ScanPhase::Idle;
        }
        state.phase.clone()
    }

    /// Back to `Idle`, dropping any error or success state. An in-flight
    /// verification keeps its phase so its result is not lost.
    pub fn reset(&self) -> ScanPhase {
        let mut state = self.state.lock().unwrap();
        if state.phase != ScanPhase::Verifying {
            state.phase = ScanPhase::Idle;
        }
        state.phase.clone()
    }

    /// Claim a decoded payload for verification. Only the first claim while
    /// scanning succeeds; it leaves `Scanning` before returning.
    pub fn claim(&self, code: String) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.phase.is_scanning() {
            state.phase = ScanPhase::Verifying;
            state.claimed = Some(code);
            true
        } else {
            debug!("Ignoring decode while {:?}", state.phase);
            false
        }
    }

    /// Take the claimed payload for verification. Returns `None` if nothing
    /// was claimed or it has already been taken.
    pub fn take_claim(&self) -> Option<Claim> {
        let mut state = self.state.lock().unwrap();
        if state.phase != ScanPhase::Verifying {
            return None;
        }
        let generation = state.generation;
        state.claimed.take().map(|code| Claim { code, generation })
    }

    /// Record the outcome of a claim's verification. Returns `None` and
    /// leaves the phase alone when the session ended after the claim.
    pub fn finish(&self, claim: &Claim, outcome: Result<(), String>) -> Option<ScanPhase> {
        let mut state = self.state.lock().unwrap();
        if claim.generation != state.generation {
            info!("Dropping verification outcome from an ended session");
            return None;
        }
        state.phase = match outcome {
            Ok(()) => ScanPhase::Verified,
            Err(message) => ScanPhase::Failed(message),
        };
        Some(state.phase.clone())
    }

    /// Forget everything, including a verification in flight. Used on
    /// sign-out.
    pub fn end_session(&self) {
        let mut state = self.state.lock().unwrap();
        state.phase = ScanPhase::Idle;
        state.claimed = None;
        state.generation += 1;
    }
}
