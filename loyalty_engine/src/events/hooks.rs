use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderResolvedEvent, WithdrawalEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_resolved_producer: Vec<EventProducer<OrderResolvedEvent>>,
    pub withdrawal_producer: Vec<EventProducer<WithdrawalEvent>>,
}

impl EventProducers {
    pub async fn publish_order_resolved(&self, event: OrderResolvedEvent) {
        for producer in &self.order_resolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    /// Used by the accrual workers, which must never stall on a slow hook. Events that do not fit in the handler's
    /// buffer are dropped with a warning.
    pub fn try_publish_order_resolved(&self, event: OrderResolvedEvent) {
        for producer in &self.order_resolved_producer {
            producer.try_publish_event(event.clone());
        }
    }

    pub async fn publish_withdrawal(&self, event: WithdrawalEvent) {
        for producer in &self.withdrawal_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_resolved: Option<EventHandler<OrderResolvedEvent>>,
    pub on_withdrawal: Option<EventHandler<WithdrawalEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_resolved = hooks.on_order_resolved.map(|f| EventHandler::new(buffer_size, f));
        let on_withdrawal = hooks.on_withdrawal.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_resolved, on_withdrawal }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_resolved {
            result.order_resolved_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal {
            result.withdrawal_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_resolved {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_withdrawal {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_resolved: Option<Handler<OrderResolvedEvent>>,
    pub on_withdrawal: Option<Handler<WithdrawalEvent>>,
}

impl EventHooks {
    pub fn on_order_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_resolved = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_withdrawal = Some(Arc::new(f));
        self
    }
}
