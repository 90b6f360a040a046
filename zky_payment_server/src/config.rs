use std::{env, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use okeconnect_tools::{OkeConnectConfig, OrkutConfig, DEFAULT_OKECONNECT_BASE_URL, DEFAULT_ORKUT_BASE_URL};
use ztg_common::Secret;

const DEFAULT_ZTG_HOST: &str = "127.0.0.1";
const DEFAULT_ZTG_PORT: u16 = 8380;
const DEFAULT_PAYMENT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_FULFILLMENT_CHECK_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_FULFILLMENT_MAX_ATTEMPTS: i64 = 12;
const DEFAULT_FULFILLMENT_BACKOFF_BASE: Duration = Duration::from_secs(5);
const DEFAULT_FULFILLMENT_BACKOFF_CAP: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How often the payment poller asks the QRIS provider for the latest settlement.
    pub payment_poll_interval: Duration,
    /// Bounded-retry policy for top-up status checks after a dispatch.
    pub fulfillment: FulfillmentConfig,
    /// Pending orders older than this are cancelled by the expiry worker. Zero disables the policy, which is the
    /// default: an unpaid invoice stays open until the customer cancels it.
    pub unpaid_order_timeout: ChronoDuration,
    /// Orkut QRIS provider credentials.
    pub orkut: OrkutConfig,
    /// OkeConnect H2H provider credentials.
    pub okeconnect: OkeConnectConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ZTG_HOST.to_string(),
            port: DEFAULT_ZTG_PORT,
            database_url: String::default(),
            payment_poll_interval: DEFAULT_PAYMENT_POLL_INTERVAL,
            fulfillment: FulfillmentConfig::default(),
            unpaid_order_timeout: ChronoDuration::zero(),
            orkut: OrkutConfig::default(),
            okeconnect: OkeConnectConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("ZTG_HOST").ok().unwrap_or_else(|| DEFAULT_ZTG_HOST.into());
        let port = env::var("ZTG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for ZTG_PORT. {e} Using the default, {DEFAULT_ZTG_PORT}, instead."
                    );
                    DEFAULT_ZTG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_ZTG_PORT);
        let database_url = zky_payment_engine::db_url();
        let payment_poll_interval = env_seconds("ZTG_PAYMENT_POLL_INTERVAL_SECS", DEFAULT_PAYMENT_POLL_INTERVAL);
        let fulfillment = FulfillmentConfig::from_env_or_default();
        let unpaid_order_timeout = configure_unpaid_order_timeout();
        let orkut = orkut_config_from_env();
        let okeconnect = okeconnect_config_from_env();
        Self { host, port, database_url, payment_poll_interval, fulfillment, unpaid_order_timeout, orkut, okeconnect }
    }
}

//-------------------------------------------  FulfillmentConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct FulfillmentConfig {
    /// Delay between the top-up dispatch and the first status check.
    pub check_delay: Duration,
    /// Maximum number of status checks before the fulfillment is marked failed.
    pub max_attempts: i64,
    /// Base delay for the exponential backoff between status checks.
    pub backoff_base: Duration,
    /// Upper bound on any single backoff delay.
    pub backoff_cap: Duration,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            check_delay: DEFAULT_FULFILLMENT_CHECK_DELAY,
            max_attempts: DEFAULT_FULFILLMENT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_FULFILLMENT_BACKOFF_BASE,
            backoff_cap: DEFAULT_FULFILLMENT_BACKOFF_CAP,
        }
    }
}

impl FulfillmentConfig {
    pub fn from_env_or_default() -> Self {
        let check_delay = env_seconds("ZTG_FULFILLMENT_CHECK_DELAY_SECS", DEFAULT_FULFILLMENT_CHECK_DELAY);
        let max_attempts = env::var("ZTG_FULFILLMENT_MAX_ATTEMPTS")
            .map_err(|_| {
                info!(
                    "🪛️ ZTG_FULFILLMENT_MAX_ATTEMPTS is not set. Using the default value of \
                     {DEFAULT_FULFILLMENT_MAX_ATTEMPTS}."
                )
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for ZTG_FULFILLMENT_MAX_ATTEMPTS. {e}"))
            })
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_FULFILLMENT_MAX_ATTEMPTS);
        let backoff_base = env_seconds("ZTG_FULFILLMENT_BACKOFF_BASE_SECS", DEFAULT_FULFILLMENT_BACKOFF_BASE);
        Self { check_delay, max_attempts, backoff_base, backoff_cap: DEFAULT_FULFILLMENT_BACKOFF_CAP }
    }
}

fn configure_unpaid_order_timeout() -> ChronoDuration {
    env::var("ZTG_UNPAID_ORDER_TIMEOUT_MINUTES")
        .map_err(|_| info!("🪛️ ZTG_UNPAID_ORDER_TIMEOUT_MINUTES is not set. Unpaid order expiry is disabled."))
        .and_then(|s| {
            s.parse::<i64>()
                .map(ChronoDuration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for ZTG_UNPAID_ORDER_TIMEOUT_MINUTES. {e}"))
        })
        .ok()
        .unwrap_or_else(ChronoDuration::zero)
}

//-------------------------------------------  Provider configs  ------------------------------------------------------
fn orkut_config_from_env() -> OrkutConfig {
    let base_url = env::var("ZTG_ORKUT_BASE_URL").ok().unwrap_or_else(|| DEFAULT_ORKUT_BASE_URL.into());
    let api_key = Secret::new(required_env("ZTG_ORKUT_API_KEY", "the QRIS provider API key"));
    let merchant_id = required_env("ZTG_ORKUT_MERCHANT_ID", "the merchant account id at the payment provider");
    let token = Secret::new(required_env("ZTG_ORKUT_TOKEN", "the merchant's settlement-query token"));
    let qris_code = required_env("ZTG_ORKUT_QRIS_CODE", "the static merchant QRIS payment code");
    OrkutConfig { base_url, api_key, merchant_id, token, qris_code }
}

fn okeconnect_config_from_env() -> OkeConnectConfig {
    let base_url = env::var("ZTG_OKECONNECT_BASE_URL").ok().unwrap_or_else(|| DEFAULT_OKECONNECT_BASE_URL.into());
    let member_id = required_env("ZTG_OKECONNECT_MEMBER_ID", "the OkeConnect H2H member id");
    let pin = Secret::new(required_env("ZTG_OKECONNECT_PIN", "the OkeConnect transaction PIN"));
    let password = Secret::new(required_env("ZTG_OKECONNECT_PASSWORD", "the OkeConnect transaction password"));
    OkeConnectConfig { base_url, member_id, pin, password }
}

fn required_env(name: &str, description: &str) -> String {
    env::var(name).ok().unwrap_or_else(|| {
        error!("🪛️ {name} is not set. Please set it to {description}.");
        String::default()
    })
}

fn env_seconds(name: &str, default: Duration) -> Duration {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {} s.", default.as_secs()))
        .and_then(|s| {
            s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}")).map(Duration::from_secs)
        })
        .ok()
        .unwrap_or(default)
}
