use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;
use zky_payment_engine::{db_types::Transaction, events::EventProducers, SqliteDatabase, TransactionFlowApi};

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, unpaid_expiry: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = TransactionFlowApi::new(db, producers);
        info!("🕰️ Unpaid order expiry worker started ({} min timeout)", unpaid_expiry.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order expiry job");
            match api.expire_unpaid_transactions(unpaid_expiry).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} unpaid orders expired: {}", expired.len(), transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running unpaid order expiry job: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|t| format!("[{}] user_id: {} product: {}", t.reference_id, t.user_id, t.product_code))
        .collect::<Vec<String>>()
        .join(", ")
}
