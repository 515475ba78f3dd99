//! Optional chat-webhook notifications.
//!
//! When `CCG_CHAT_WEBHOOK_URL` is configured, a message is posted to it after every fresh
//! commission creation. Strictly best-effort: the post happens on the event hook, outside the
//! financial flow, and failures are logged but never retried.

use creator_commerce_engine::events::{EventHandlers, EventHooks};
use log::*;
use reqwest::Client;
use serde_json::json;

pub const CHAT_EVENT_BUFFER_SIZE: usize = 25;

pub fn create_chat_event_handlers(webhook_url: String) -> EventHandlers {
    let client = Client::new();
    let mut hooks = EventHooks::default();
    hooks.on_commission_created(move |ev| {
        let client = client.clone();
        let url = webhook_url.clone();
        let text = format!(
            "💶 {} earned {} on order {} ({} of {})",
            ev.creator.name, ev.commission.amount, ev.order.order_id, ev.commission.rate, ev.commission.order_subtotal
        );
        Box::pin(async move {
            match client.post(&url).json(&json!({ "text": text })).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("💬️ Chat notification delivered");
                },
                Ok(response) => {
                    warn!("💬️ Chat webhook answered {}. Not retrying.", response.status());
                },
                Err(e) => {
                    warn!("💬️ Could not deliver chat notification: {e}. Not retrying.");
                },
            }
        })
    });
    EventHandlers::new(CHAT_EVENT_BUFFER_SIZE, hooks)
}
