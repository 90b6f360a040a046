use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use ztg_common::Idr;

use crate::{
    config::{OkeConnectConfig, OrkutConfig},
    data_objects::{PaymentStatusResponse, QrisResponse, TopupStatus},
    helpers::parse_topup_status,
    OkeConnectApiError,
    OrkutApiError,
};

/// Every provider round trip gets an explicit deadline. The upstream APIs occasionally hang rather than fail, and
/// a poller tick must never outlive its interval.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

//--------------------------------------       OrkutApi      ---------------------------------------------------------
/// Client for the Orkut QRIS API: QR-code issuance and merchant settlement polling.
#[derive(Clone)]
pub struct OrkutApi {
    config: OrkutConfig,
    client: Arc<Client>,
}

impl OrkutApi {
    pub fn new(config: OrkutConfig) -> Result<Self, OrkutApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OrkutApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn get_query<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, OrkutApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("💳️ Sending QRIS provider query: {url}");
        let response = self.client.get(url).query(params).send().await.map_err(|e| {
            if e.is_timeout() {
                OrkutApiError::Timeout
            } else {
                OrkutApiError::RequestError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| OrkutApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| OrkutApiError::RequestError(e.to_string()))?;
            Err(OrkutApiError::QueryError { status, message })
        }
    }

    /// Issue a new QR code for the given total. The caller is responsible for only calling this once per order;
    /// provider-issued codes carry provider-side state and cost, so idempotency is enforced at the storage layer
    /// before this method is reached.
    pub async fn create_qris(&self, total: Idr) -> Result<QrisResponse, OrkutApiError> {
        if !total.is_positive() {
            return Err(OrkutApiError::InvalidAmount(total));
        }
        let amount = total.value().to_string();
        debug!("💳️ Requesting QRIS for {total}");
        let response: QrisResponse = self
            .get_query("/createqris", &[
                ("apikey", self.config.api_key.reveal().as_str()),
                ("amount", amount.as_str()),
                ("codeqr", self.config.qris_code.as_str()),
            ])
            .await?;
        if !response.success {
            return Err(OrkutApiError::ProviderFailure(format!("QR issuance for {total} was not successful")));
        }
        info!("💳️ QRIS issued for {total}. Provider txid: {}", response.result.transaction_id);
        Ok(response)
    }

    /// Ask the provider for the status of the merchant's most recent settlement. The reported amount (not the
    /// status string) is what payment matching keys off.
    pub async fn check_payment_status(&self) -> Result<PaymentStatusResponse, OrkutApiError> {
        let response: PaymentStatusResponse = self
            .get_query("/checkstatus", &[
                ("apikey", self.config.api_key.reveal().as_str()),
                ("merchant", self.config.merchant_id.as_str()),
                ("token", self.config.token.reveal().as_str()),
            ])
            .await?;
        if !response.success {
            return Err(OrkutApiError::ProviderFailure("Settlement status query was not successful".into()));
        }
        trace!(
            "💳️ Settlement status: {} ({})",
            response.result.status,
            response.result.amount.map(|a| a.to_string()).unwrap_or_else(|| "no amount".into())
        );
        Ok(response)
    }
}

//--------------------------------------    OkeConnectApi    ---------------------------------------------------------
/// Client for the OkeConnect H2H API. Dispatching a top-up and checking on one are the same GET request; only the
/// interpretation of the free-text response differs.
#[derive(Clone)]
pub struct OkeConnectApi {
    config: OkeConnectConfig,
    client: Arc<Client>,
}

impl OkeConnectApi {
    pub fn new(config: OkeConnectConfig) -> Result<Self, OkeConnectApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OkeConnectApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn trx_query(&self, product: &str, dest: &str, ref_id: &str) -> Result<String, OkeConnectApiError> {
        let url = format!("{}/trx", self.config.base_url);
        let response = self
            .client
            .get(url)
            .query(&[
                ("product", product),
                ("dest", dest),
                ("refID", ref_id),
                ("memberID", self.config.member_id.as_str()),
                ("pin", self.config.pin.reveal().as_str()),
                ("password", self.config.password.reveal().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OkeConnectApiError::Timeout
                } else {
                    OkeConnectApiError::RequestError(e.to_string())
                }
            })?;
        if response.status().is_success() {
            response.text().await.map_err(|e| OkeConnectApiError::RequestError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| OkeConnectApiError::RequestError(e.to_string()))?;
            Err(OkeConnectApiError::QueryError { status, message })
        }
    }

    /// Fire the top-up for `product` to the destination game account. Returns the raw provider response; callers
    /// log it and move on to status polling regardless of its content.
    pub async fn dispatch_topup(&self, product: &str, dest: &str, ref_id: &str) -> Result<String, OkeConnectApiError> {
        debug!("🚚️ Dispatching top-up {product} for order {ref_id}");
        let text = self.trx_query(product, dest, ref_id).await?;
        info!("🚚️ Dispatch response for order {ref_id}: {text}");
        Ok(text)
    }

    /// Check on a previously dispatched top-up. Repeats the trx call with the same reference id, which OkeConnect
    /// treats as a status query rather than a new order.
    pub async fn check_topup_status(
        &self,
        product: &str,
        dest: &str,
        ref_id: &str,
    ) -> Result<TopupStatus, OkeConnectApiError> {
        let text = self.trx_query(product, dest, ref_id).await?;
        let status = parse_topup_status(&text);
        debug!("🚚️ Top-up status for order {ref_id}: {} (SN: {:?})", status.status, status.serial_number);
        Ok(status)
    }
}
