use ztg_common::Secret;

pub const DEFAULT_ORKUT_BASE_URL: &str = "https://api.itzky.xyz/orkut";
pub const DEFAULT_OKECONNECT_BASE_URL: &str = "https://h2h.okeconnect.com";

/// Connection details for the Orkut QRIS API.
#[derive(Clone, Debug)]
pub struct OrkutConfig {
    /// Base URL for the QRIS endpoints, e.g. "https://api.itzky.xyz/orkut"
    pub base_url: String,
    pub api_key: Secret<String>,
    /// The merchant account id at the payment provider, e.g. "OK1356619"
    pub merchant_id: String,
    /// The merchant's settlement-query token.
    pub token: Secret<String>,
    /// The static merchant QRIS payment code that every issued QR is derived from.
    pub qris_code: String,
}

impl Default for OrkutConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORKUT_BASE_URL.to_string(),
            api_key: Secret::default(),
            merchant_id: String::default(),
            token: Secret::default(),
            qris_code: String::default(),
        }
    }
}

/// Connection details for the OkeConnect H2H top-up API.
#[derive(Clone, Debug)]
pub struct OkeConnectConfig {
    /// Base URL for the H2H endpoints, e.g. "https://h2h.okeconnect.com"
    pub base_url: String,
    pub member_id: String,
    pub pin: Secret<String>,
    pub password: Secret<String>,
}

impl Default for OkeConnectConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OKECONNECT_BASE_URL.to_string(),
            member_id: String::default(),
            pin: Secret::default(),
            password: Secret::default(),
        }
    }
}
