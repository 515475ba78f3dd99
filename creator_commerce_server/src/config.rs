use std::{env, time::Duration};

use ccg_common::{EurCents, Secret};
use log::*;
use rand::RngCore;

const DEFAULT_CCG_HOST: &str = "127.0.0.1";
const DEFAULT_CCG_PORT: u16 = 8380;
const DEFAULT_MATURITY_DAYS: i64 = 14;
const DEFAULT_PAYOUT_FEE_CENTS: i64 = 35;
const DEFAULT_RAIL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RAIL_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The shared secret used to verify the platform's webhook signatures.
    pub shopify: ShopifyConfig,
    /// The key admin clients must present in the `X-CCG-Api-Key` header.
    pub admin_api_key: Secret<String>,
    /// Days a commission is held back before it becomes payable. Protects payouts against
    /// the refund window. Zero disables the hold.
    pub commission_maturity_days: i64,
    /// Flat fee deducted from each payout transfer.
    pub payout_fee: EurCents,
    pub rail: RailConfig,
    /// Optional chat webhook fired (best-effort) when a commission is created.
    pub chat_webhook_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
}

#[derive(Clone, Debug)]
pub struct RailConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub timeout: Duration,
    pub max_transient_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CCG_HOST.to_string(),
            port: DEFAULT_CCG_PORT,
            database_url: String::default(),
            shopify: ShopifyConfig { hmac_secret: Secret::default(), hmac_checks: true },
            admin_api_key: Secret::default(),
            commission_maturity_days: DEFAULT_MATURITY_DAYS,
            payout_fee: EurCents::from(DEFAULT_PAYOUT_FEE_CENTS),
            rail: RailConfig {
                base_url: String::default(),
                api_key: Secret::default(),
                timeout: Duration::from_secs(DEFAULT_RAIL_TIMEOUT_SECS),
                max_transient_attempts: DEFAULT_RAIL_MAX_ATTEMPTS,
            },
            chat_webhook_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let host = env::var("CCG_HOST").ok().unwrap_or_else(|| DEFAULT_CCG_HOST.into());
        let port = env::var("CCG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for CCG_PORT. {e} Using the default, {DEFAULT_CCG_PORT}, instead.");
                    DEFAULT_CCG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CCG_PORT);
        let database_url = env::var("CCG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CCG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let shopify = ShopifyConfig::from_env_or_default();
        let admin_api_key = admin_api_key_from_env();
        let commission_maturity_days = env_i64("CCG_COMMISSION_MATURITY_DAYS", DEFAULT_MATURITY_DAYS);
        let payout_fee = EurCents::from(env_i64("CCG_PAYOUT_FEE_CENTS", DEFAULT_PAYOUT_FEE_CENTS));
        let rail = RailConfig::from_env_or_default();
        let chat_webhook_url = env::var("CCG_CHAT_WEBHOOK_URL").ok().filter(|s| !s.is_empty());
        if chat_webhook_url.is_none() {
            info!("🪛️ CCG_CHAT_WEBHOOK_URL is not set. Commission chat notifications are disabled.");
        }
        Self {
            host,
            port,
            database_url,
            shopify,
            admin_api_key,
            commission_maturity_days,
            payout_fee,
            rail,
            chat_webhook_url,
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_default() -> Self {
        let hmac_secret = env::var("CCG_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ CCG_SHOPIFY_HMAC_SECRET is not set. Please set it to the webhook signing key for your shop.");
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = env::var("CCG_SHOPIFY_HMAC_CHECKS").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        if hmac_checks && hmac_secret.is_empty() {
            warn!(
                "🚨️ HMAC checks are enabled but no secret is configured. Every webhook delivery will be rejected \
                 until CCG_SHOPIFY_HMAC_SECRET is set."
            );
        }
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are DISABLED. Do not run production like this.");
        }
        Self { hmac_secret, hmac_checks }
    }
}

impl RailConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("CCG_RAIL_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CCG_RAIL_URL is not set. Payout execution will fail until it is configured.");
            String::default()
        });
        let api_key = Secret::new(env::var("CCG_RAIL_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ CCG_RAIL_API_KEY is not set. Payout execution will fail until it is configured.");
            String::default()
        }));
        let timeout = env::var("CCG_RAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_RAIL_TIMEOUT_SECS));
        let max_transient_attempts = env::var("CCG_RAIL_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RAIL_MAX_ATTEMPTS);
        Self { base_url, api_key, timeout, max_transient_attempts }
    }
}

fn admin_api_key_from_env() -> Secret<String> {
    match env::var("CCG_ADMIN_API_KEY") {
        Ok(key) if !key.is_empty() => Secret::new(key),
        _ => {
            let mut bytes = [0u8; 24];
            rand::thread_rng().fill_bytes(&mut bytes);
            let key: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
            warn!(
                "🚨️🚨️🚨️ CCG_ADMIN_API_KEY is not set. I'm using the random value {key} for this session. Admin \
                 calls made with it will stop working on restart; set the variable for production. 🚨️🚨️🚨️"
            );
            Secret::new(key)
        },
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}")))
        .ok()
        .unwrap_or(default)
}
