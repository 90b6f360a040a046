use log::*;
use okeconnect_tools::OrkutApi;
use tokio::task::JoinHandle;
use zky_payment_engine::{events::EventProducers, SqliteDatabase, TransactionFlowApi};

use crate::errors::ServerError;

/// Starts the payment poller. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Each tick the poller asks the QRIS provider for the latest settlement against the merchant account and tries
/// to match its amount against every open order. Settlement of an order publishes the transaction-paid event via
/// the producers handed in here, which is what triggers fulfillment.
pub fn start_payment_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    qr: OrkutApi,
    poll_interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        let api = TransactionFlowApi::new(db, producers);
        info!("🔄️💰️ Payment poller started ({}s interval)", poll_interval.as_secs());
        loop {
            timer.tick().await;
            // Nothing may escape the loop. A provider hiccup on one tick must not stop the poller.
            if let Err(e) = poll_once(&api, &qr).await {
                warn!("🔄️💰️ Payment poll round failed: {e}");
            }
        }
    })
}

async fn poll_once(api: &TransactionFlowApi<SqliteDatabase>, qr: &OrkutApi) -> Result<(), ServerError> {
    let pending = api.fetch_pollable_transactions().await?;
    if pending.is_empty() {
        return Ok(());
    }
    trace!("🔄️💰️ {} open orders to match against", pending.len());
    let report = qr.check_payment_status().await?;
    let Some(amount) = report.result.amount else {
        trace!("🔄️💰️ No settlement amount reported; nothing to match");
        return Ok(());
    };
    let reported = amount.as_idr();
    for transaction in pending {
        match api.settle_payment(transaction.id, reported).await {
            Ok(Some(paid)) => {
                info!("🔄️💰️ Order [{}] settled by the payment poller", paid.reference_id);
                // One settlement report settles at most one order; expected totals are unique by construction.
                break;
            },
            Ok(None) => {},
            Err(e) => warn!("🔄️💰️ Could not settle order [{}]: {e}", transaction.reference_id),
        }
    }
    Ok(())
}
