//! Camera-frame decoding and the scan/verify state machine.

pub mod decode;
pub mod session;

pub use decode::decode_frame;
pub use session::{Claim, ScanPhase, ScanSession};

use serde::Serialize;

/// Result of submitting one captured frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Not scanning (camera closed or a code was already claimed).
    Skipped,
    /// Frame unreadable or contained no QR code.
    NoCode,
    /// A code was decoded and claimed; verification may proceed.
    Claimed(String),
}
