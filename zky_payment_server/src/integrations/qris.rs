//! QR issuance glue between the lifecycle API and the Orkut provider.
//!
//! Provider-issued QR codes carry provider-side state and cost, so the cardinal rule here is: one QR code per
//! order, ever. The storage layer enforces it with a conditional write; this module makes sure no provider call
//! even happens when a payload is already stored.
use log::*;
use okeconnect_tools::{OrkutApi, OrkutApiError, QrisResponse};
use zky_payment_engine::{db_types::Transaction, TransactionDatabase, TransactionFlowApi};
use ztg_common::Idr;

use crate::errors::ServerError;

/// The seam between the invoice view and the QRIS provider. The server hands in an [`OrkutApi`]; tests hand in
/// a counting fake to show that a stored payload short-circuits the provider entirely.
#[allow(async_fn_in_trait)]
pub trait QrIssuer: Clone + Send + Sync {
    async fn issue_qr(&self, total: Idr) -> Result<QrisResponse, OrkutApiError>;
}

impl QrIssuer for OrkutApi {
    async fn issue_qr(&self, total: Idr) -> Result<QrisResponse, OrkutApiError> {
        self.create_qris(total).await
    }
}

/// Return the QRIS payload for a pending order, issuing one first if the order has none.
///
/// The stored payload always wins: if this order already carries `qris_data`, it is returned without any
/// provider call. Otherwise the fee is made durable, `amount + fee` is sent to the issuer, and the result is
/// attached with a conditional write. A failure from the issuer is transient; the order stays pending and the
/// next invoice view tries again.
pub async fn issue_or_reuse_qris<B, Q>(
    api: &TransactionFlowApi<B>,
    issuer: &Q,
    transaction: &Transaction,
) -> Result<Transaction, ServerError>
where
    B: TransactionDatabase,
    Q: QrIssuer,
{
    if transaction.qris_data.is_some() {
        trace!("💳️ Order [{}] already has a QR code; re-serving it", transaction.reference_id);
        return Ok(transaction.clone());
    }
    let fee = api.ensure_fee(transaction).await?;
    let total = transaction.amount + fee;
    let response = issuer.issue_qr(total).await?;
    let payload = serde_json::to_value(&response)
        .map_err(|e| ServerError::BackendError(format!("Could not serialize QRIS payload: {e}")))?;
    let stored = api.attach_qris(transaction.id, &response.result.transaction_id, &payload).await?;
    info!("💳️ Order [{}] now carries QR code {}", stored.reference_id, response.result.transaction_id);
    Ok(stored)
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use okeconnect_tools::{QrisPayload, ReportedAmount};
    use sqlx::{migrate::MigrateDatabase, Sqlite};
    use zky_payment_engine::{
        db_types::NewTransaction,
        events::EventProducers,
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        SqliteDatabase,
    };

    use super::*;

    #[derive(Clone)]
    struct CountingIssuer {
        calls: Arc<AtomicUsize>,
        txid: String,
    }

    impl CountingIssuer {
        fn new(txid: &str) -> Self {
            Self { calls: Arc::new(AtomicUsize::new(0)), txid: txid.to_string() }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    impl QrIssuer for CountingIssuer {
        async fn issue_qr(&self, total: Idr) -> Result<QrisResponse, OrkutApiError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(QrisResponse {
                success: true,
                result: QrisPayload {
                    transaction_id: self.txid.clone(),
                    amount: Some(ReportedAmount(total.value())),
                    expiration_time: None,
                    qr_image_url: format!("https://cdn.example.com/qr/{}.png", self.txid),
                },
            })
        }
    }

    async fn setup() -> TransactionFlowApi<SqliteDatabase> {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        TransactionFlowApi::new(db, EventProducers::default())
    }

    async fn tear_down(mut api: TransactionFlowApi<SqliteDatabase>) {
        use zky_payment_engine::TransactionDatabase;
        let url = api.db().url().to_string();
        let _ = api.db_mut().close().await;
        Sqlite::drop_database(&url).await.unwrap();
    }

    #[tokio::test]
    async fn qr_is_issued_exactly_once_per_order() {
        let api = setup().await;
        let issuer = CountingIssuer::new("TX-TEST-1");
        let transaction = api.checkout(NewTransaction::new("U1", "ML86", Idr::from(20_000))).await.unwrap();
        assert!(transaction.qris_data.is_none());

        let issued = issue_or_reuse_qris(&api, &issuer, &transaction).await.unwrap();
        assert_eq!(issuer.call_count(), 1);
        assert_eq!(issued.external_transaction_id.as_deref(), Some("TX-TEST-1"));
        let first_payload = issued.qris().expect("payload must be stored");

        // Refreshing the invoice page must re-serve the stored payload without a provider call.
        let reused = issue_or_reuse_qris(&api, &issuer, &issued).await.unwrap();
        assert_eq!(issuer.call_count(), 1);
        assert_eq!(reused.qris(), Some(first_payload.clone()));

        // Even with a stale row (fetched before issuance) the conditional write keeps the first payload.
        let second_issuer = CountingIssuer::new("TX-TEST-2");
        let raced = issue_or_reuse_qris(&api, &second_issuer, &transaction).await.unwrap();
        assert_eq!(second_issuer.call_count(), 1);
        assert_eq!(raced.external_transaction_id.as_deref(), Some("TX-TEST-1"));
        assert_eq!(raced.qris(), Some(first_payload));
        tear_down(api).await;
    }
}
