use std::fmt::Display;

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize};
use ztg_common::Idr;

//--------------------------------------   ReportedAmount   ----------------------------------------------------------
/// An amount as reported by the provider. The QRIS API is inconsistent about whether amounts come back as JSON
/// numbers or as strings, so this type normalizes both to an integer before any comparison is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportedAmount(pub i64);

impl ReportedAmount {
    pub fn as_idr(&self) -> Idr {
        Idr::from(self.0)
    }
}

impl Display for ReportedAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ReportedAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Number(n) => {
                n.as_i64().map(ReportedAmount).ok_or_else(|| DeError::custom(format!("{n} is not an integer amount")))
            },
            serde_json::Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ReportedAmount)
                .map_err(|e| DeError::custom(format!("'{s}' is not an integer amount. {e}"))),
            other => Err(DeError::custom(format!("Unexpected amount representation: {other}"))),
        }
    }
}

//--------------------------------------    QrisResponse    ----------------------------------------------------------
/// The envelope returned by the `createqris` endpoint. Stored verbatim (as JSON) against the transaction so a QR
/// code is only ever issued once per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrisResponse {
    pub success: bool,
    pub result: QrisPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrisPayload {
    /// The transaction id assigned by the payment provider.
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<ReportedAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    pub qr_image_url: String,
}

//--------------------------------------  PaymentStatusResponse  -----------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub result: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub status: String,
    /// The settled amount of the most recent payment against the merchant account, if any.
    #[serde(default)]
    pub amount: Option<ReportedAmount>,
}

//--------------------------------------     TopupStatus     ---------------------------------------------------------
/// The result of an OkeConnect status check, parsed out of the free-text response by
/// [`crate::helpers::parse_topup_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopupStatus {
    pub status: String,
    pub serial_number: Option<String>,
    pub raw: String,
}

impl TopupStatus {
    /// OkeConnect signals a completed delivery with the keyword "Sukses" in the status field. The comparison is
    /// case-insensitive because the casing varies between response formats.
    pub fn is_fulfilled(&self) -> bool {
        self.status.eq_ignore_ascii_case("sukses")
    }
}
