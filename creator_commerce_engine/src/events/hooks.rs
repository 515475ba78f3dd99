use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CommissionCreatedEvent, EventHandler, EventProducer, Handler, PayoutSentEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub commission_created_producer: Vec<EventProducer<CommissionCreatedEvent>>,
    pub payout_sent_producer: Vec<EventProducer<PayoutSentEvent>>,
}

pub struct EventHandlers {
    pub on_commission_created: Option<EventHandler<CommissionCreatedEvent>>,
    pub on_payout_sent: Option<EventHandler<PayoutSentEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_commission_created = hooks.on_commission_created.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_sent = hooks.on_payout_sent.map(|f| EventHandler::new(buffer_size, f));
        Self { on_commission_created, on_payout_sent }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_commission_created {
            result.commission_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_sent {
            result.payout_sent_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_commission_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payout_sent {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_commission_created: Option<Handler<CommissionCreatedEvent>>,
    pub on_payout_sent: Option<Handler<PayoutSentEvent>>,
}

impl EventHooks {
    pub fn on_commission_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CommissionCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_commission_created = Some(Arc::new(f));
        self
    }

    pub fn on_payout_sent<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutSentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_sent = Some(Arc::new(f));
        self
    }
}
