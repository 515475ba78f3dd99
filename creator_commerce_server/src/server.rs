use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use creator_commerce_engine::{
    events::EventProducers,
    CommissionPolicy,
    LedgerApi,
    NotificationApi,
    OrderFlowApi,
    PayoutApi,
    PayoutPolicy,
    SqliteDatabase,
};
use log::info;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{chat::create_chat_event_handlers, rail::HttpPaymentRail},
    maturity_worker::start_maturity_worker,
    middleware::{ApiKeyMiddlewareFactory, HmacMiddlewareFactory, HMAC_HEADER},
    routes::{
        health,
        ApproveBatchRoute,
        BackfillNotificationsRoute,
        CreateBatchRoute,
        CreatorBalanceRoute,
        CreatorLedgerRoute,
        ExecuteBatchRoute,
        GetBatchRoute,
    },
    shopify_routes::{
        ShopifyOrderCancelledRoute,
        ShopifyOrderCreatedRoute,
        ShopifyOrderPaidRoute,
        ShopifyRefundCreatedRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let rail = HttpPaymentRail::new(&config.rail)?;
    let producers = match &config.chat_webhook_url {
        Some(url) => {
            info!("💬️ Chat notifications enabled");
            let handlers = create_chat_event_handlers(url.clone());
            let producers = handlers.producers();
            handlers.start_handlers().await;
            producers
        },
        None => EventProducers::default(),
    };
    let policy = CommissionPolicy::with_maturity_days(config.commission_maturity_days);
    start_maturity_worker(db.clone(), policy);
    let srv = create_server_instance(config, db, rail, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    rail: HttpPaymentRail,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_host = config.host.clone();
    let bind_port = config.port;
    let srv = HttpServer::new(move || {
        let commission_policy = CommissionPolicy::with_maturity_days(config.commission_maturity_days);
        let payout_policy = PayoutPolicy {
            fee_per_transfer: config.payout_fee,
            rail_timeout: config.rail.timeout,
            max_transient_attempts: config.rail.max_transient_attempts,
        };
        let order_flow = OrderFlowApi::new(db.clone(), producers.clone(), commission_policy);
        let payout_api = PayoutApi::new(db.clone(), rail.clone(), producers.clone(), payout_policy);
        let ledger_api = LedgerApi::new(db.clone());
        let notification_api = NotificationApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ccg::access_log"))
            .app_data(web::Data::new(order_flow))
            .app_data(web::Data::new(payout_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(notification_api));
        // Platform webhooks, HMAC-verified over the raw body before any handler runs
        let shopify_scope = web::scope("/shopify")
            .wrap(HmacMiddlewareFactory::new(
                HMAC_HEADER,
                config.shopify.hmac_secret.clone(),
                config.shopify.hmac_checks,
            ))
            .service(ShopifyOrderCreatedRoute::<SqliteDatabase>::new())
            .service(ShopifyOrderPaidRoute::<SqliteDatabase>::new())
            .service(ShopifyRefundCreatedRoute::<SqliteDatabase>::new())
            .service(ShopifyOrderCancelledRoute::<SqliteDatabase>::new());
        // Admin surface, API-key gated
        let api_scope = web::scope("/api")
            .wrap(ApiKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(CreateBatchRoute::<SqliteDatabase, HttpPaymentRail>::new())
            .service(ApproveBatchRoute::<SqliteDatabase, HttpPaymentRail>::new())
            .service(ExecuteBatchRoute::<SqliteDatabase, HttpPaymentRail>::new())
            .service(GetBatchRoute::<SqliteDatabase, HttpPaymentRail>::new())
            .service(CreatorBalanceRoute::<SqliteDatabase>::new())
            .service(CreatorLedgerRoute::<SqliteDatabase>::new())
            .service(BackfillNotificationsRoute::<SqliteDatabase>::new());
        app.service(health).service(shopify_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_host.as_str(), bind_port))?
    .run();
    Ok(srv)
}
