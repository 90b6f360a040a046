//! Top-up fulfillment, driven by the transaction-paid event.
//!
//! When the payment poller settles an order, the engine publishes a `TransactionPaidEvent`. The handler built
//! here claims the dispatch (a conditional update that succeeds exactly once per order, so a duplicate event is
//! harmless), fires the OkeConnect top-up, and then polls the delivery status with a bounded, backed-off retry
//! schedule. The outcome is persisted: `fulfilled` with the serial number, or `failed` once the attempts run out.
use std::time::Duration;

use log::*;
use okeconnect_tools::{helpers::dispatch_indicates_success, OkeConnectApi};
use rand::Rng;
use zky_payment_engine::{
    db_types::Transaction,
    events::{EventHandlers, EventHooks, EventProducers},
    SqliteDatabase,
    TransactionFlowApi,
};

use crate::config::FulfillmentConfig;

/// A status token OkeConnect uses for a definitively failed delivery. Seeing it ends the retry loop early.
const FAILED_STATUS_TOKEN: &str = "gagal";

/// Build the event handlers that connect "order paid" to "top-up delivered".
///
/// The returned handlers still need `start_handlers().await` before any producer publishes.
pub fn create_fulfillment_event_handlers(
    db: SqliteDatabase,
    providers: OkeConnectApi,
    config: FulfillmentConfig,
) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_transaction_paid(move |event| {
        let db = db.clone();
        let providers = providers.clone();
        let config = config.clone();
        Box::pin(async move {
            fulfill_order(db, providers, config, event.transaction).await;
        })
    });
    EventHandlers::new(50, hooks)
}

async fn fulfill_order(
    db: SqliteDatabase,
    providers: OkeConnectApi,
    config: FulfillmentConfig,
    transaction: Transaction,
) {
    let flow = TransactionFlowApi::new(db, EventProducers::default());
    let reference = transaction.reference_id.to_string();
    match flow.claim_fulfillment(transaction.id).await {
        Ok(true) => {},
        Ok(false) => {
            info!("🚚️ Order [{reference}] fulfillment was already dispatched; ignoring duplicate event");
            return;
        },
        Err(e) => {
            error!("🚚️ Could not claim fulfillment for order [{reference}]: {e}");
            return;
        },
    }
    let product = transaction.product_code.as_str();
    let dest = transaction.user_id.as_str();
    match providers.dispatch_topup(product, dest, &reference).await {
        Ok(text) if dispatch_indicates_success(&text) => {
            debug!("🚚️ Order [{reference}] dispatch already reports delivery; confirming via status check");
        },
        Ok(_) => {},
        // A dispatch error does not abort: OkeConnect regularly times out on the dispatch call while still
        // processing the order, and the status poll below resolves either way.
        Err(e) => warn!("🚚️ Dispatch for order [{reference}] returned an error: {e}"),
    }
    tokio::time::sleep(config.check_delay).await;
    loop {
        let attempt = match flow.record_fulfillment_attempt(transaction.id).await {
            Ok(n) => n,
            Err(e) => {
                error!("🚚️ Could not record fulfillment attempt for order [{reference}]: {e}");
                return;
            },
        };
        match providers.check_topup_status(product, dest, &reference).await {
            Ok(status) if status.is_fulfilled() => {
                match flow.complete_fulfillment(transaction.id, status.serial_number.as_deref()).await {
                    Ok(()) => info!(
                        "🚚️ Order [{reference}] fulfilled after {attempt} status checks (SN: {})",
                        status.serial_number.as_deref().unwrap_or("none")
                    ),
                    Err(e) => error!("🚚️ Could not record fulfillment for order [{reference}]: {e}"),
                }
                return;
            },
            Ok(status) if status.status.eq_ignore_ascii_case(FAILED_STATUS_TOKEN) => {
                warn!("🚚️ Order [{reference}] top-up reported as failed by the provider: {}", status.raw);
                if let Err(e) = flow.fail_fulfillment(transaction.id).await {
                    error!("🚚️ Could not record fulfillment failure for order [{reference}]: {e}");
                }
                return;
            },
            Ok(status) => {
                debug!("🚚️ Order [{reference}] not delivered yet (status {}), attempt {attempt}", status.status);
            },
            Err(e) => warn!("🚚️ Status check {attempt} for order [{reference}] failed: {e}"),
        }
        if attempt >= config.max_attempts {
            error!("🚚️ Giving up on order [{reference}] after {attempt} status checks");
            if let Err(e) = flow.fail_fulfillment(transaction.id).await {
                error!("🚚️ Could not record fulfillment failure for order [{reference}]: {e}");
            }
            return;
        }
        tokio::time::sleep(backoff_delay(&config, attempt)).await;
    }
}

/// Exponential backoff with jitter: `base * 2^(attempt-1)`, capped, plus up to one second of random spread so
/// that simultaneously paid orders do not poll in lockstep.
fn backoff_delay(config: &FulfillmentConfig, attempt: i64) -> Duration {
    let exponent = u32::try_from(attempt.clamp(1, 16) - 1).unwrap_or(0);
    let factor = 2u32.saturating_pow(exponent);
    let delay = config.backoff_base.saturating_mul(factor).min(config.backoff_cap);
    let jitter = rand::thread_rng().gen_range(0..1000);
    delay + Duration::from_millis(jitter)
}
