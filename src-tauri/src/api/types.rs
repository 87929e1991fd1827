use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /api/verify-qr`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub qr_code: String,
    pub client_uid: String,
}

/// Verification outcome returned by the redemption API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/getclientdata`.
#[derive(Debug, Clone, Serialize)]
pub struct RosterRequest {
    pub uid: String,
}

/// One customer record as stored by the redemption API.
///
/// `product_json` is kept as the raw serialized string; it is only parsed
/// for display, and exported untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RosterEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub college: String,
    #[serde(rename = "productJSON", default, deserialize_with = "null_as_empty")]
    pub product_json: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
