use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use okeconnect_tools::{OkeConnectApi, OrkutApi};
use zky_payment_engine::{events::EventProducers, run_migrations, SqliteDatabase, TransactionFlowApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::fulfillment::create_fulfillment_event_handlers,
    payment_worker::start_payment_worker,
    routes,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    run_migrations(db.pool()).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let orkut = OrkutApi::new(config.orkut.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let okeconnect =
        OkeConnectApi::new(config.okeconnect.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;

    // Fulfillment rides on the transaction-paid event, so the handlers must be running before any producer
    // (the poller or the manual check route) can publish.
    let handlers = create_fulfillment_event_handlers(db.clone(), okeconnect, config.fulfillment.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    start_payment_worker(db.clone(), producers.clone(), orkut.clone(), config.payment_poll_interval);
    if config.unpaid_order_timeout > chrono::Duration::zero() {
        start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    } else {
        info!("🕰️ Unpaid order expiry is disabled");
    }

    let srv = create_server_instance(config, db, orkut, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    orkut: OrkutApi,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let api = TransactionFlowApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ztg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(orkut.clone()))
            .service(
                web::scope("/api")
                    .service(routes::checkout)
                    .service(routes::invoice)
                    .service(routes::invoice_status)
                    .service(routes::cancel_invoice)
                    .service(routes::check_payment),
            )
            .service(routes::health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
