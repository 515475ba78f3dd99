//----------------------------------------------   Webhooks   --------------------------------------------------------
//
// The platform delivers webhooks at-least-once, so every handler here must be idempotent —
// that is the engine's job (upserts + the idempotency gate); this module only translates
// payloads and maps outcomes onto status codes:
//
// * 200: processed, replayed, or a defined miss ("no attribution", unknown order).
// * 400: malformed payload. No idempotency record is created, so a corrected retry is new.
// * 401: bad signature, rejected by the HMAC middleware before any handler runs.
// * 500: unexpected internal error. The platform redelivers later; the idempotency gate
//   makes the redelivery safe. Webhook callers never see business detail beyond this.

use actix_web::{web, HttpResponse};
use creator_commerce_engine::{
    db_types::OrderId,
    traits::{CommerceDatabase, CommerceError},
    OrderFlowApi,
    OrderPaidResult,
};
use log::*;

use crate::{
    data_objects::JsonResponse,
    integrations::shopify::{new_order_from_shopify_order, OrderConversionError},
    route,
    shopify_order::{ShopifyOrder, ShopifyRefund},
};

route!(shopify_order_created => Post "/webhook/order_created" impl CommerceDatabase);
pub async fn shopify_order_created<B>(body: web::Json<ShopifyOrder>, api: web::Data<OrderFlowApi<B>>) -> HttpResponse
where B: CommerceDatabase + 'static {
    let payload = body.into_inner();
    let order = match new_order_from_shopify_order(payload) {
        Ok(order) => order,
        Err(e) => return conversion_failure(e),
    };
    match api.process_order_created(order).await {
        Ok((order, _)) => {
            info!("🛍️ Order {} recorded from the created webhook.", order.order_id);
            HttpResponse::Ok().json(JsonResponse::success("Order recorded."))
        },
        Err(e) => internal_failure("order_created", e),
    }
}

route!(shopify_order_paid => Post "/webhook/order_paid" impl CommerceDatabase);
pub async fn shopify_order_paid<B>(body: web::Json<ShopifyOrder>, api: web::Data<OrderFlowApi<B>>) -> HttpResponse
where B: CommerceDatabase + 'static {
    let payload = body.into_inner();
    let order = match new_order_from_shopify_order(payload) {
        Ok(order) => order,
        Err(e) => return conversion_failure(e),
    };
    match api.process_order_paid(order).await {
        Ok(OrderPaidResult::Processed(outcome)) => {
            info!(
                "🛍️ Order {} processed. Attributed: {}",
                outcome.order.order_id,
                outcome.commission.is_some()
            );
            HttpResponse::Ok().json(JsonResponse::success("Order processed successfully."))
        },
        Ok(OrderPaidResult::Replayed(_)) => {
            info!("🛍️ Duplicate delivery handled idempotently.");
            HttpResponse::Ok().json(JsonResponse::success("Order already processed."))
        },
        Ok(OrderPaidResult::InFlight) => {
            info!("🛍️ Delivery raced a concurrent processing attempt. Backing off.");
            HttpResponse::Ok().json(JsonResponse::success("Order is already being processed."))
        },
        Err(e) => internal_failure("order_paid", e),
    }
}

route!(shopify_refund_created => Post "/webhook/refund_created" impl CommerceDatabase);
pub async fn shopify_refund_created<B>(body: web::Json<ShopifyRefund>, api: web::Data<OrderFlowApi<B>>) -> HttpResponse
where B: CommerceDatabase + 'static {
    let refund = body.into_inner();
    let order_id = OrderId(refund.order_id.to_string());
    match api.process_order_refunded(&order_id).await {
        Ok(_) => HttpResponse::Ok().json(JsonResponse::success("Refund processed.")),
        Err(CommerceError::OrderNotFound(id)) => {
            // A refund for an order this subsystem never saw. Nothing to annul, and a retry
            // would change nothing.
            warn!("🛍️ Refund webhook for unknown order {id}.");
            HttpResponse::Ok().json(JsonResponse::success("Unknown order. Nothing to do."))
        },
        Err(e) => internal_failure("refund_created", e),
    }
}

route!(shopify_order_cancelled => Post "/webhook/order_cancelled" impl CommerceDatabase);
pub async fn shopify_order_cancelled<B>(body: web::Json<ShopifyOrder>, api: web::Data<OrderFlowApi<B>>) -> HttpResponse
where B: CommerceDatabase + 'static {
    let payload = body.into_inner();
    let order_id = OrderId(payload.id.to_string());
    match api.process_order_canceled(&order_id).await {
        Ok(_) => HttpResponse::Ok().json(JsonResponse::success("Cancellation processed.")),
        Err(CommerceError::OrderNotFound(id)) => {
            warn!("🛍️ Cancellation webhook for unknown order {id}.");
            HttpResponse::Ok().json(JsonResponse::success("Unknown order. Nothing to do."))
        },
        Err(e) => internal_failure("order_cancelled", e),
    }
}

fn conversion_failure(e: OrderConversionError) -> HttpResponse {
    warn!("🛍️ Could not convert webhook payload. {e}");
    HttpResponse::BadRequest().json(JsonResponse::failure("Invalid order payload."))
}

fn internal_failure(topic: &str, e: CommerceError) -> HttpResponse {
    // 500 makes the platform redeliver; the idempotency gate absorbs the duplicate. The
    // caller gets no business detail.
    error!("🛍️ Unexpected error handling {topic} webhook: {e}");
    HttpResponse::InternalServerError().json(JsonResponse::failure("Internal error processing order event."))
}
