use chrono::Utc;
use tracing::{info, warn};
use url::Url;

use super::types::{ErrorBody, RefreshResponse, Session, SignInRequest, SignInResponse};
use crate::error::RedeemDeskError;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Credential exchange against the hosted identity provider's REST API.
pub struct IdentityClient {
    client: reqwest::Client,
    sign_in_url: Url,
    refresh_url: Url,
}

impl IdentityClient {
    pub fn new(api_key: &str) -> Result<Self, RedeemDeskError> {
        Self::with_endpoints(api_key, IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL)
    }

    pub fn with_endpoints(
        api_key: &str,
        sign_in_url: &str,
        refresh_url: &str,
    ) -> Result<Self, RedeemDeskError> {
        let client = reqwest::Client::builder()
            .user_agent("RedeemDesk/1.0")
            .build()
            .map_err(|e| RedeemDeskError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sign_in_url: keyed_url(sign_in_url, api_key)?,
            refresh_url: keyed_url(refresh_url, api_key)?,
        })
    }

    /// Exchange email and password for a session. Provider rejections are
    /// returned with the provider's message unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RedeemDeskError> {
        info!("Signing in {}", email);
        let resp = self
            .client
            .post(self.sign_in_url.clone())
            .json(&SignInRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| RedeemDeskError::IdentityUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        let body: SignInResponse = resp
            .json()
            .await
            .map_err(|e| RedeemDeskError::Identity(format!("Failed to parse response: {}", e)))?;
        Ok(body.into_session(Utc::now()))
    }

    /// Trade a refresh token for a fresh session.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        email: Option<String>,
    ) -> Result<Session, RedeemDeskError> {
        info!("Refreshing identity session");
        let resp = self
            .client
            .post(self.refresh_url.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| RedeemDeskError::IdentityUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(provider_error(resp).await);
        }

        let body: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| RedeemDeskError::Identity(format!("Failed to parse response: {}", e)))?;
        Ok(body.into_session(email, Utc::now()))
    }
}

fn keyed_url(raw: &str, api_key: &str) -> Result<Url, RedeemDeskError> {
    let mut url = Url::parse(raw)
        .map_err(|e| RedeemDeskError::Config(format!("Invalid identity endpoint '{}': {}", raw, e)))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

async fn provider_error(resp: reqwest::Response) -> RedeemDeskError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    warn!("Identity provider returned {}", status);
    RedeemDeskError::Identity(provider_message(status, &text))
}

fn provider_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| format!("Sign-in failed ({})", status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_url_appends_api_key() {
        let url = keyed_url(IDENTITY_TOOLKIT_URL, "web-key").unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=web-key"
        );
    }

    #[test]
    fn test_keyed_url_escapes_key() {
        let url = keyed_url(SECURE_TOKEN_URL, "a b&c").unwrap();
        assert_eq!(url.query(), Some("key=a+b%26c"));
    }

    #[test]
    fn test_provider_message_is_verbatim() {
        let body = r#"{"error":{"code":400,"message":"INVALID_LOGIN_CREDENTIALS"}}"#;
        assert_eq!(
            provider_message(reqwest::StatusCode::BAD_REQUEST, body),
            "INVALID_LOGIN_CREDENTIALS"
        );
    }

    #[test]
    fn test_provider_message_falls_back_to_status() {
        let msg = provider_message(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(msg, "Sign-in failed (502 Bad Gateway)");
    }

    #[test]
    fn test_client_rejects_bad_endpoint() {
        let result = IdentityClient::with_endpoints("k", "not a url", SECURE_TOKEN_URL);
        assert!(matches!(result, Err(RedeemDeskError::Config(_))));
    }
}
