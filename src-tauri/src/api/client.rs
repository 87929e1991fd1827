use tracing::{info, warn};
use url::Url;

use super::types::{RosterEntry, RosterRequest, VerifyRequest, VerifyResponse};
use super::RedemptionBackend;

const VERIFY_PATH: &str = "api/verify-qr";
const ROSTER_PATH: &str = "api/getclientdata";

/// HTTP client for the redemption API.
///
/// No request timeout is configured: a hung request blocks only the flow
/// that issued it.
pub struct RedemptionClient {
    client: reqwest::Client,
    verify_url: Url,
    roster_url: Url,
}

impl RedemptionClient {
    /// Build a client rooted at `base_url` (must end in `/`, see
    /// [`crate::config::normalize_base_url`]).
    pub fn new(base_url: &Url) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("RedeemDesk/1.0")
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            verify_url: endpoint(base_url, VERIFY_PATH)?,
            roster_url: endpoint(base_url, ROSTER_PATH)?,
        })
    }

    pub fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    pub fn roster_url(&self) -> &Url {
        &self.roster_url
    }
}

fn endpoint(base_url: &Url, path: &str) -> Result<Url, String> {
    base_url
        .join(path)
        .map_err(|e| format!("Invalid endpoint '{}' for base '{}': {}", path, base_url, e))
}

impl RedemptionBackend for RedemptionClient {
    async fn verify_qr(&self, qr_code: &str, client_uid: &str) -> Result<VerifyResponse, String> {
        info!("POST {}", self.verify_url);
        let resp = self
            .client
            .post(self.verify_url.clone())
            .json(&VerifyRequest {
                qr_code: qr_code.to_string(),
                client_uid: client_uid.to_string(),
            })
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!("verify-qr returned {}", status);
            return Err(format!("API error ({})", status));
        }

        resp.json::<VerifyResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }

    async fn fetch_roster(&self, uid: &str) -> Result<Vec<RosterEntry>, String> {
        info!("POST {}", self.roster_url);
        let resp = self
            .client
            .post(self.roster_url.clone())
            .json(&RosterRequest {
                uid: uid.to_string(),
            })
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!("getclientdata returned {}", status);
            return Err(format!("API error ({})", status));
        }

        resp.json::<Vec<RosterEntry>>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}
