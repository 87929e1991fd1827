use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sessions are refreshed this long before the provider's stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Lifetime assumed when the provider's `expiresIn` cannot be parsed.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// An authenticated identity-provider session. Tokens never leave the
/// backend; the webview only sees [`SessionUser`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }

    pub fn user(&self) -> SessionUser {
        SessionUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }

    pub fn persisted(&self) -> PersistedSession {
        PersistedSession {
            refresh_token: self.refresh_token.clone(),
            email: self.email.clone(),
        }
    }
}

/// The part of a session the dashboard is allowed to observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: Option<String>,
}

/// What survives an app restart (stored in the keychain as JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub refresh_token: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInResponse {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub user_id: String,
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
}

pub(crate) fn expiry_from(now: DateTime<Utc>, expires_in: Option<&str>) -> DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_LIFETIME_SECS);
    now + Duration::seconds(secs)
}

impl SignInResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = expiry_from(now, self.expires_in.as_deref());
        Session {
            uid: self.local_id,
            email: self.email,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

impl RefreshResponse {
    pub fn into_session(self, email: Option<String>, now: DateTime<Utc>) -> Session {
        let expires_at = expiry_from(now, self.expires_in.as_deref());
        Session {
            uid: self.user_id,
            email,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}
