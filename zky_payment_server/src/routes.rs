//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! All handlers are async: every one of them does database or provider I/O, and a blocked worker thread would
//! stall unrelated requests.
use actix_web::{get, post, web, HttpResponse, Responder};
use log::*;
use okeconnect_tools::OrkutApi;
use serde_json::json;
use zky_payment_engine::{
    db_types::{NewTransaction, TransactionStatus},
    SqliteDatabase,
    TransactionFlowApi,
};

use crate::{
    data_objects::{CheckPaymentResult, InvoiceResult},
    errors::ServerError,
    integrations::qris::issue_or_reuse_qris,
};

type FlowApi = TransactionFlowApi<SqliteDatabase>;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ---------------------------------------------   Checkout  ---------------------------------------------------
/// Route handler for the checkout endpoint
///
/// Creates a new pending order from the request body. The store assigns the public reference id and the fee
/// disambiguator; the response carries the full transaction record, including both. No provider call is made
/// here; the QR code is issued lazily on the first invoice view.
#[post("/checkout")]
pub async fn checkout(api: web::Data<FlowApi>, body: web::Json<NewTransaction>) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ Checkout request for product {} from user {}", order.product_code, order.user_id);
    let transaction = api.checkout(order).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

// ----------------------------------------------   Invoice  ---------------------------------------------------
/// Route handler for the invoice view
///
/// `{id}` may be the numeric store id or the public reference id. Viewing a pending invoice ensures the fee is
/// assigned and issues the QRIS payload if the order does not have one yet; a stored payload is always re-served
/// as-is, so refreshing the page never creates a second QR code.
#[get("/invoice/{id}")]
pub async fn invoice(
    api: web::Data<FlowApi>,
    qr: web::Data<OrkutApi>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET invoice for {id}");
    let mut transaction = api.fetch_transaction(&id).await?;
    if transaction.status == TransactionStatus::Pending {
        transaction = issue_or_reuse_qris(api.get_ref(), qr.get_ref(), &transaction).await?;
    }
    Ok(HttpResponse::Ok().json(InvoiceResult::from(transaction)))
}

/// Lightweight status endpoint for UI polling. Never touches a provider.
#[get("/invoice/{id}/status")]
pub async fn invoice_status(api: web::Data<FlowApi>, path: web::Path<String>) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET invoice status for {id}");
    let transaction = api.fetch_transaction(&id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "reference_id": transaction.reference_id,
        "status": transaction.status,
        "fulfillment_status": transaction.fulfillment_status,
        "serial_number": transaction.serial_number,
    })))
}

/// Cancel a pending order. Cancelling an order that has already settled (or was already cancelled) is rejected
/// with a 400 and changes nothing.
#[post("/invoice/{id}/cancel")]
pub async fn cancel_invoice(api: web::Data<FlowApi>, path: web::Path<String>) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ Cancel request for invoice {id}");
    let transaction = api.cancel_transaction(&id).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

// -------------------------------------------   Check payment  ------------------------------------------------
/// Run one payment-poll round for a single order, on demand.
///
/// The invoice page offers this as an "I have paid" button so a customer does not have to wait for the next
/// poller tick. The matching logic is identical to the poller's: the provider's reported settlement amount must
/// equal the order's expected total exactly. `settled` is true only when this call performed the settlement, so
/// an already-closed order reports `settled: false` alongside its status. The provider is only consulted once a
/// QR code has been issued; before that there is no provider transaction to check against.
#[post("/invoice/{id}/check-payment")]
pub async fn check_payment(
    api: web::Data<FlowApi>,
    qr: web::Data<OrkutApi>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ Manual payment check for invoice {id}");
    let transaction = api.fetch_transaction(&id).await?;
    if transaction.status != TransactionStatus::Pending {
        return Ok(HttpResponse::Ok().json(CheckPaymentResult { settled: false, status: transaction.status }));
    }
    if transaction.external_transaction_id.is_none() {
        debug!("💻️ Invoice {id} has no QR code yet; skipping the provider check");
        return Ok(HttpResponse::Ok().json(CheckPaymentResult { settled: false, status: transaction.status }));
    }
    let report = qr.check_payment_status().await?;
    let settled = match report.result.amount {
        Some(amount) => api.settle_payment(transaction.id, amount.as_idr()).await?.is_some(),
        None => false,
    };
    let status = api.fetch_transaction(&id).await?.status;
    Ok(HttpResponse::Ok().json(CheckPaymentResult { settled, status }))
}

#[cfg(test)]
mod test {
    use actix_web::{test, App};
    use okeconnect_tools::OrkutConfig;
    use sqlx::{migrate::MigrateDatabase, Sqlite};
    use zky_payment_engine::{
        events::EventProducers,
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        TransactionDatabase,
    };
    use ztg_common::{Idr, Secret};

    use super::*;

    /// Points at a closed port. If a handler consults the provider when it should not, the request fails and the
    /// response is a 502 instead of a 200.
    fn unreachable_qr_provider() -> OrkutApi {
        let config = OrkutConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: Secret::new("key".to_string()),
            merchant_id: "OK0000".to_string(),
            token: Secret::new("token".to_string()),
            qris_code: "0002010102".to_string(),
        };
        OrkutApi::new(config).expect("Error creating provider client")
    }

    async fn setup() -> TransactionFlowApi<SqliteDatabase> {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        TransactionFlowApi::new(db, EventProducers::default())
    }

    async fn tear_down(mut api: TransactionFlowApi<SqliteDatabase>) {
        let url = api.db().url().to_string();
        let _ = api.db_mut().close().await;
        Sqlite::drop_database(&url).await.unwrap();
    }

    #[actix_web::test]
    async fn manual_check_reports_settled_only_for_its_own_settlement() {
        let api = setup().await;
        let order = api.checkout(NewTransaction::new("U9", "FF100", Idr::from(15_000))).await.unwrap();
        let app_api = TransactionFlowApi::new(api.db().clone(), EventProducers::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_api))
                .app_data(web::Data::new(unreachable_qr_provider()))
                .service(check_payment),
        )
        .await;

        // No QR code has been issued yet, so there is no provider transaction to check against.
        let uri = format!("/invoice/{}/check-payment", order.reference_id);
        let req = test::TestRequest::post().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["settled"], json!(false));
        assert_eq!(body["status"], json!("pending"));

        // Settle the order out of band. A later check finds it closed and must not claim the settlement.
        let expected = order.expected_total().unwrap();
        assert!(api.settle_payment(order.id, expected).await.unwrap().is_some());
        let req = test::TestRequest::post().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["settled"], json!(false));
        assert_eq!(body["status"], json!("success"));
        tear_down(api).await;
    }
}
