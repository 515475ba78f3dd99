//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Webhook handlers live in [`crate::shopify_routes`]; this module carries the liveness check
//! and the admin payout/ledger surface.
use actix_web::{get, web, HttpResponse, Responder};
use creator_commerce_engine::{
    traits::{LedgerManagement, NotificationManagement, Pagination, PaymentRail, PayoutDatabase},
    ExecuteOutcome,
    LedgerApi,
    NotificationApi,
    PayoutApi,
};
use log::*;

use crate::{
    data_objects::{BalanceResponse, BatchView, JsonResponse, LedgerQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💓️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Payout batches   ------------------------------------------------------

route!(create_batch => Post "/batches" impl PayoutDatabase, PaymentRail);
pub async fn create_batch<B, R>(api: web::Data<PayoutApi<B, R>>) -> Result<HttpResponse, ServerError>
where
    B: PayoutDatabase + 'static,
    R: PaymentRail + 'static,
{
    let (batch, items) = api.create_batch().await?;
    info!("🖥️ Drafted payout batch #{} with {} items", batch.id, items.len());
    Ok(HttpResponse::Ok().json(BatchView { batch, items }))
}

route!(approve_batch => Post "/batches/{id}/approve" impl PayoutDatabase, PaymentRail);
pub async fn approve_batch<B, R>(
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B, R>>,
) -> Result<HttpResponse, ServerError>
where
    B: PayoutDatabase + 'static,
    R: PaymentRail + 'static,
{
    let batch_id = path.into_inner();
    let batch = api.approve_batch(batch_id).await?;
    Ok(HttpResponse::Ok().json(batch))
}

route!(execute_batch => Post "/batches/{id}/execute" impl PayoutDatabase, PaymentRail);
pub async fn execute_batch<B, R>(
    path: web::Path<i64>,
    api: web::Data<PayoutApi<B, R>>,
) -> Result<HttpResponse, ServerError>
where
    B: PayoutDatabase + 'static,
    R: PaymentRail + 'static,
{
    let batch_id = path.into_inner();
    match api.execute_batch(batch_id).await? {
        ExecuteOutcome::Executed(report) => Ok(HttpResponse::Ok().json(report)),
        ExecuteOutcome::Replayed(report) => Ok(HttpResponse::Ok().json(report)),
        ExecuteOutcome::InFlight => {
            Ok(HttpResponse::Accepted().json(JsonResponse::success("Execution is already in flight.")))
        },
    }
}

route!(get_batch => Get "/batches/{id}" impl PayoutDatabase, PaymentRail);
pub async fn get_batch<B, R>(path: web::Path<i64>, api: web::Data<PayoutApi<B, R>>) -> Result<HttpResponse, ServerError>
where
    B: PayoutDatabase + 'static,
    R: PaymentRail + 'static,
{
    let batch_id = path.into_inner();
    let (batch, items) = api.batch(batch_id).await?;
    Ok(HttpResponse::Ok().json(BatchView { batch, items }))
}

//------------------------------------------   Ledger views   --------------------------------------------------------

route!(creator_balance => Get "/creators/{id}/balance" impl LedgerManagement);
pub async fn creator_balance<B>(path: web::Path<i64>, api: web::Data<LedgerApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerManagement + 'static {
    let creator_id = path.into_inner();
    let balance = api.balance(creator_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { creator_id, balance }))
}

route!(creator_ledger => Get "/creators/{id}/ledger" impl LedgerManagement);
pub async fn creator_ledger<B>(
    path: web::Path<i64>,
    query: web::Query<LedgerQuery>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: LedgerManagement + 'static {
    let creator_id = path.into_inner();
    let pagination = Pagination::new(query.page.unwrap_or(0), query.limit.unwrap_or(50));
    let entries = api.entries(creator_id, pagination).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//------------------------------------------   Notifications   -------------------------------------------------------

route!(backfill_notifications => Post "/notifications/backfill" impl NotificationManagement);
pub async fn backfill_notifications<B>(api: web::Data<NotificationApi<B>>) -> Result<HttpResponse, ServerError>
where B: NotificationManagement + 'static {
    let created = api.backfill().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "created": created.len() })))
}
