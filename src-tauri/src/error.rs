use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RedeemDeskError {
    #[error("User is not authenticated. Cannot verify QR code.")]
    Unauthenticated,

    #[error("Error verifying QR code")]
    Network,

    #[error("QR code not verified")]
    NotVerified,

    #[error("User is not authenticated.")]
    NotSignedIn,

    #[error("Error fetching client data")]
    RosterFetch,

    #[error("{0}")]
    Identity(String),

    #[error("Identity provider unreachable: {0}")]
    IdentityUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl From<RedeemDeskError> for String {
    fn from(err: RedeemDeskError) -> Self {
        err.to_string()
    }
}
