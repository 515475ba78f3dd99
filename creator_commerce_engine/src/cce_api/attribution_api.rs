use log::{debug, warn};

use crate::{
    db_types::{Attribution, AttributionSource, CreatorStatus, NewOrder},
    traits::{AttributionError, AttributionStore},
};

/// Resolves which creator (if any) referred an incoming order.
///
/// Three signals are tried in strict descending priority, stopping at the first hit:
///
/// 1. **Cart attributes** (priority 3) — explicit `creator_id`/`routine_id` note attributes
///    set at checkout. Explicit intent, highest confidence.
/// 2. **Checkout session** (priority 2) — the order's cart token matched against the
///    session table the checkout flow maintains. Covers carts that lost their attributes.
/// 3. **Discount code** (priority 1) — a case-insensitive match on a creator's unique code.
///    Codes get shared and guessed, so this is only a fallback.
///
/// The precedence is a contract: explicit signals outrank inferred ones, and reordering them
/// changes who gets paid. Each signal only matches `Active` creators; a signal pointing at an
/// inactive or unknown creator is logged and the cascade moves on to the next one.
///
/// No match is a defined outcome, not an error: the order proceeds unattributed.
pub struct AttributionResolver<B> {
    store: B,
}

impl<B> AttributionResolver<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }
}

impl<B> AttributionResolver<B>
where B: AttributionStore
{
    pub async fn resolve(&self, order: &NewOrder) -> Result<Option<Attribution>, AttributionError> {
        if let Some(attribution) = self.from_cart_attributes(order).await? {
            return Ok(Some(attribution));
        }
        if let Some(attribution) = self.from_checkout_session(order).await? {
            return Ok(Some(attribution));
        }
        if let Some(attribution) = self.from_discount_code(order).await? {
            return Ok(Some(attribution));
        }
        debug!("🎯️ No attribution found for order {}", order.order_id);
        Ok(None)
    }

    async fn from_cart_attributes(&self, order: &NewOrder) -> Result<Option<Attribution>, AttributionError> {
        let creator_id = match order.note_creator_id {
            Some(id) => id,
            None => return Ok(None),
        };
        match self.store.fetch_creator(creator_id).await? {
            Some(creator) if creator.status == CreatorStatus::Active => {
                debug!("🎯️ Order {} attributed to creator #{creator_id} via cart attributes", order.order_id);
                Ok(Some(Attribution {
                    creator_id: creator.id,
                    routine_id: order.note_routine_id,
                    source: AttributionSource::CartAttributes,
                }))
            },
            Some(_) => {
                debug!("🎯️ Cart attribute on order {} names inactive creator #{creator_id}. Trying weaker signals.", order.order_id);
                Ok(None)
            },
            None => {
                warn!("🎯️ Cart attribute on order {} names unknown creator #{creator_id}", order.order_id);
                Ok(None)
            },
        }
    }

    async fn from_checkout_session(&self, order: &NewOrder) -> Result<Option<Attribution>, AttributionError> {
        let token = match order.cart_token.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(None),
        };
        let session = match self.store.fetch_checkout_session(token).await? {
            Some(s) => s,
            None => return Ok(None),
        };
        match self.store.fetch_creator(session.creator_id).await? {
            Some(creator) if creator.status == CreatorStatus::Active => {
                debug!("🎯️ Order {} attributed to creator #{} via checkout session", order.order_id, creator.id);
                Ok(Some(Attribution {
                    creator_id: creator.id,
                    routine_id: session.routine_id,
                    source: AttributionSource::CheckoutSession,
                }))
            },
            _ => {
                debug!(
                    "🎯️ Checkout session for order {} points at inactive or missing creator #{}",
                    order.order_id, session.creator_id
                );
                Ok(None)
            },
        }
    }

    async fn from_discount_code(&self, order: &NewOrder) -> Result<Option<Attribution>, AttributionError> {
        let code = match order.discount_code.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => return Ok(None),
        };
        match self.store.fetch_creator_by_discount_code(code).await? {
            Some(creator) if creator.status == CreatorStatus::Active => {
                debug!("🎯️ Order {} attributed to creator #{} via discount code {code}", order.order_id, creator.id);
                Ok(Some(Attribution { creator_id: creator.id, routine_id: None, source: AttributionSource::DiscountCode }))
            },
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, sync::Arc};

    use ccg_common::{CommissionRate, EurCents};
    use chrono::Utc;

    use super::*;
    use crate::db_types::{CheckoutSession, Creator, CreatorStatus, OrderId};

    #[derive(Clone, Default)]
    struct MemoryStore {
        creators: Arc<HashMap<i64, Creator>>,
        sessions: Arc<HashMap<String, CheckoutSession>>,
    }

    impl AttributionStore for MemoryStore {
        async fn fetch_creator(&self, creator_id: i64) -> Result<Option<Creator>, AttributionError> {
            Ok(self.creators.get(&creator_id).cloned())
        }

        async fn fetch_creator_by_discount_code(&self, code: &str) -> Result<Option<Creator>, AttributionError> {
            Ok(self.creators.values().find(|c| c.discount_code.eq_ignore_ascii_case(code)).cloned())
        }

        async fn fetch_checkout_session(&self, cart_token: &str) -> Result<Option<CheckoutSession>, AttributionError> {
            Ok(self.sessions.get(cart_token).cloned())
        }
    }

    fn creator(id: i64, code: &str, status: CreatorStatus) -> Creator {
        Creator {
            id,
            name: format!("creator-{id}"),
            email: format!("creator-{id}@example.com"),
            discount_code: code.to_string(),
            commission_rate: CommissionRate::from_basis_points(1500).unwrap(),
            status,
            iban: None,
            bank_verified: false,
            ledger_frozen: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store(creators: Vec<Creator>, sessions: Vec<(&str, i64)>) -> MemoryStore {
        let creators = creators.into_iter().map(|c| (c.id, c)).collect();
        let sessions = sessions
            .into_iter()
            .enumerate()
            .map(|(i, (token, creator_id))| {
                (token.to_string(), CheckoutSession {
                    id: i as i64 + 1,
                    cart_token: token.to_string(),
                    creator_id,
                    routine_id: Some(7),
                    created_at: Utc::now(),
                })
            })
            .collect();
        MemoryStore { creators: Arc::new(creators), sessions: Arc::new(sessions) }
    }

    fn order() -> NewOrder {
        NewOrder::new(OrderId::from("1001".to_string()), EurCents::from(10_000), EurCents::from(11_000), Utc::now())
    }

    #[tokio::test]
    async fn cart_attributes_beat_a_different_creators_discount_code() {
        let store = store(vec![creator(1, "EMMA15", CreatorStatus::Active), creator(2, "NOAH10", CreatorStatus::Active)], vec![]);
        let resolver = AttributionResolver::new(store);
        let order = order().with_discount_code("EMMA15").with_note_attributes(Some(2), Some(42));
        let attribution = resolver.resolve(&order).await.unwrap().unwrap();
        assert_eq!(attribution.creator_id, 2);
        assert_eq!(attribution.routine_id, Some(42));
        assert_eq!(attribution.source, AttributionSource::CartAttributes);
        assert_eq!(attribution.priority(), 3);
    }

    #[tokio::test]
    async fn checkout_session_beats_discount_code() {
        let store = store(
            vec![creator(1, "EMMA15", CreatorStatus::Active), creator(2, "NOAH10", CreatorStatus::Active)],
            vec![("cart-abc", 2)],
        );
        let resolver = AttributionResolver::new(store);
        let order = order().with_discount_code("EMMA15").with_cart_token("cart-abc");
        let attribution = resolver.resolve(&order).await.unwrap().unwrap();
        assert_eq!(attribution.creator_id, 2);
        assert_eq!(attribution.source, AttributionSource::CheckoutSession);
        assert_eq!(attribution.routine_id, Some(7));
    }

    #[tokio::test]
    async fn discount_code_matches_case_insensitively() {
        let store = store(vec![creator(1, "EMMA15", CreatorStatus::Active)], vec![]);
        let resolver = AttributionResolver::new(store);
        let attribution = resolver.resolve(&order().with_discount_code("emma15")).await.unwrap().unwrap();
        assert_eq!(attribution.creator_id, 1);
        assert_eq!(attribution.source, AttributionSource::DiscountCode);
        assert_eq!(attribution.priority(), 1);
    }

    #[tokio::test]
    async fn inactive_creator_falls_through_to_the_next_signal() {
        let store = store(vec![creator(1, "EMMA15", CreatorStatus::Inactive), creator(2, "NOAH10", CreatorStatus::Active)], vec![]);
        let resolver = AttributionResolver::new(store);
        // The cart attribute names the inactive creator; the discount code belongs to an
        // active one and wins by fallback.
        let order = order().with_note_attributes(Some(1), None).with_discount_code("NOAH10");
        let attribution = resolver.resolve(&order).await.unwrap().unwrap();
        assert_eq!(attribution.creator_id, 2);
        assert_eq!(attribution.source, AttributionSource::DiscountCode);
    }

    #[tokio::test]
    async fn no_signal_means_no_attribution() {
        let store = store(vec![creator(1, "EMMA15", CreatorStatus::Active)], vec![]);
        let resolver = AttributionResolver::new(store);
        assert!(resolver.resolve(&order()).await.unwrap().is_none());
        assert!(resolver.resolve(&order().with_discount_code("UNKNOWN")).await.unwrap().is_none());
    }
}
