use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use serde_json::json;

use crate::{
    cce_api::attribution_api::AttributionResolver,
    db_types::{Commission, IdempotencyCheck, NewOrder, Order, OrderId, OrderStatusType},
    events::{CommissionCreatedEvent, EventProducers},
    traits::{AnnulledOrderOutcome, CommerceDatabase, CommerceError, PaidOrderOutcome},
};

/// Idempotency operation name for the paid-order webhook. One key per external order id.
pub const OP_ORDER_PAID: &str = "order_paid";

/// Policy inputs for commission creation. The maturity hold protects payouts against the
/// refund window; it is configuration, not a constant of the state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionPolicy {
    pub maturity: Option<Duration>,
}

impl CommissionPolicy {
    pub fn with_maturity_days(days: i64) -> Self {
        if days <= 0 {
            Self { maturity: None }
        } else {
            Self { maturity: Some(Duration::days(days)) }
        }
    }
}

/// `OrderFlowApi` handles the order lifecycle events delivered by the platform webhook:
/// created, paid, refunded and cancelled. The paid event is the only one that creates money
/// movement and is the only one guarded by the idempotency gate; the others are naturally
/// idempotent upserts.
///
/// The webhook feed is at-least-once: redeliveries of the same event are expected and must
/// land on the cached response instead of re-running side effects.
pub struct OrderFlowApi<B> {
    db: B,
    resolver: AttributionResolver<B>,
    producers: EventProducers,
    policy: CommissionPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: CommissionPolicy) -> Self {
        let resolver = AttributionResolver::new(db.clone());
        Self { db, resolver, producers, policy }
    }
}

/// The result of a paid-order webhook delivery.
#[derive(Debug)]
pub enum OrderPaidResult {
    /// First delivery: the order was processed and these are the fresh records.
    Processed(PaidOrderOutcome),
    /// A redelivery of an already-completed event. The cached response is returned verbatim
    /// and no side effects ran.
    Replayed(serde_json::Value),
    /// Another worker currently holds the idempotency key. Nothing was done; the platform
    /// will redeliver if the in-flight attempt dies.
    InFlight,
}

impl<B> OrderFlowApi<B>
where B: CommerceDatabase
{
    /// Handles the order-created event: resolve attribution and upsert the order as
    /// `Pending`. No commission yet; that waits for the paid event.
    pub async fn process_order_created(&self, order: NewOrder) -> Result<(Order, bool), CommerceError> {
        let attribution = self.resolver.resolve(&order).await?;
        let (stored, inserted) = self.db.upsert_order(&order, OrderStatusType::Pending, attribution.as_ref()).await?;
        debug!(
            "🔄️📦️ Order {} recorded ({}). Attribution: {}",
            stored.order_id,
            if inserted { "new" } else { "updated" },
            attribution.map(|a| format!("creator #{} via {}", a.creator_id, a.source)).unwrap_or_else(|| "none".into())
        );
        Ok((stored, inserted))
    }

    /// Handles the order-paid event behind the idempotency gate.
    ///
    /// On the first delivery this confirms the order, creates the commission (when
    /// attribution succeeds), appends the `CommissionEarned` ledger entry, fires the
    /// commission-created hook and caches a response. Redeliveries get the cached response
    /// and no side effects.
    pub async fn process_order_paid(&self, order: NewOrder) -> Result<OrderPaidResult, CommerceError> {
        let natural_key = order.order_id.as_str().to_string();
        match self.db.acquire_idempotency_key(OP_ORDER_PAID, &natural_key).await? {
            IdempotencyCheck::Completed(response) => {
                info!("🔄️📦️ Order {} paid event replayed. Returning cached response.", order.order_id);
                return Ok(OrderPaidResult::Replayed(response));
            },
            IdempotencyCheck::InFlight => {
                info!("🔄️📦️ Order {} paid event is already being processed elsewhere. Backing off.", order.order_id);
                return Ok(OrderPaidResult::InFlight);
            },
            IdempotencyCheck::New => {},
            IdempotencyCheck::RetryAfterFailure(last_error) => {
                info!("🔄️📦️ Retrying paid event for order {} after earlier failure: {last_error}", order.order_id);
            },
        }
        let outcome = match self.run_paid_order(&order).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Leave a Failed marker so the next redelivery is offered a retry.
                if let Err(mark) = self.db.fail_idempotency_key(OP_ORDER_PAID, &natural_key, &e.to_string()).await {
                    error!("🔄️📦️ Could not mark idempotency key for order {} as failed: {mark}", order.order_id);
                }
                return Err(e);
            },
        };
        let response = json!({
            "order_id": outcome.order.order_id.clone(),
            "attributed": outcome.commission.is_some(),
            "commission_id": outcome.commission.as_ref().map(|c| c.id),
            "commission_amount": outcome.commission.as_ref().map(|c| c.amount),
        });
        self.db.complete_idempotency_key(OP_ORDER_PAID, &natural_key, &response).await?;
        self.call_commission_created_hook(&outcome).await;
        Ok(OrderPaidResult::Processed(outcome))
    }

    async fn run_paid_order(&self, order: &NewOrder) -> Result<PaidOrderOutcome, CommerceError> {
        let attribution = self.resolver.resolve(order).await?;
        let outcome = self.db.process_paid_order(order, attribution.as_ref(), self.policy.maturity).await?;
        match (&outcome.commission, &outcome.ledger_entry) {
            (Some(c), Some(_)) => info!("🔄️📦️ Order {} paid. Commission {} of {} created.", order.order_id, c.id, c.amount),
            (Some(c), None) => debug!("🔄️📦️ Order {} paid. Commission {} already existed.", order.order_id, c.id),
            _ => info!("🔄️📦️ Order {} paid without attribution. No commission created.", order.order_id),
        }
        Ok(outcome)
    }

    async fn call_commission_created_hook(&self, outcome: &PaidOrderOutcome) {
        // Fresh creation always comes with its ledger entry; a pre-existing commission
        // (partial redo) must not fire the hook again.
        let (commission, creator) = match (&outcome.commission, &outcome.creator, &outcome.ledger_entry) {
            (Some(commission), Some(creator), Some(_)) => (commission, creator),
            _ => return,
        };
        for emitter in &self.producers.commission_created_producer {
            debug!("🔄️📦️ Notifying commission created hook subscribers");
            let event = CommissionCreatedEvent {
                order: outcome.order.clone(),
                commission: commission.clone(),
                creator: creator.clone(),
            };
            emitter.publish_event(event).await;
        }
    }

    /// Handles the refund webhook. The order moves to `Refunded`; a `Paid` commission is
    /// cancelled with an offsetting ledger entry, anything earlier is cancelled without one.
    pub async fn process_order_refunded(&self, order_id: &OrderId) -> Result<AnnulledOrderOutcome, CommerceError> {
        let outcome = self.db.annul_order(order_id, OrderStatusType::Refunded).await?;
        info!("🔄️↩️ Order {order_id} refunded. Commission: {}", describe_commission(&outcome.commission));
        Ok(outcome)
    }

    /// Handles the order-cancelled webhook. Same commission semantics as a refund.
    pub async fn process_order_canceled(&self, order_id: &OrderId) -> Result<AnnulledOrderOutcome, CommerceError> {
        let outcome = self.db.annul_order(order_id, OrderStatusType::Canceled).await?;
        info!("🔄️❌️ Order {order_id} cancelled. Commission: {}", describe_commission(&outcome.commission));
        Ok(outcome)
    }

    /// The maturity sweep, called periodically by the server's background worker.
    pub async fn release_matured_commissions(&self, now: DateTime<Utc>) -> Result<Vec<Commission>, CommerceError> {
        self.db.release_matured_commissions(now).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn describe_commission(commission: &Option<Commission>) -> String {
    match commission {
        Some(c) => format!("{} ({})", c.id, c.status),
        None => "none".to_string(),
    }
}
