use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the stock engine after a mutating transaction commits.
///
/// Consumers (notification fan-out, projections, downstream sync) subscribe to
/// the channel; the engine never blocks a transaction on event delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockReserved {
        tenant_id: Uuid,
        order_line_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
        backordered: bool,
    },
    StockReleased {
        tenant_id: Uuid,
        order_line_id: Uuid,
        quantity: i32,
    },
    StockConsumed {
        tenant_id: Uuid,
        order_line_id: Uuid,
        quantity: i32,
    },
    StockAdjusted {
        tenant_id: Uuid,
        warehouse_id: Uuid,
        variant_id: Uuid,
        qty_delta: i32,
        new_available: i32,
    },
    StockTransferred {
        tenant_id: Uuid,
        transfer_id: Uuid,
        variant_id: Uuid,
        source_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
        quantity: i32,
    },
    WarehouseCreated {
        tenant_id: Uuid,
        warehouse_id: Uuid,
    },
}

/// Inbound event from the Order subsystem: an order line was created and its
/// demand must be reserved. Delivered at-least-once; handling is idempotent by
/// `order_line_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineCreated {
    pub tenant_id: Uuid,
    pub order_line_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    pub preferred_warehouse_id: Option<Uuid>,
    pub allow_backorder: bool,
}

/// Inbound event from the Order subsystem: an order line was removed before
/// fulfillment and its reservations must be returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRemoved {
    pub tenant_id: Uuid,
    pub order_line_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel sized from configuration.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event.
///
/// Embedders that need delivery beyond the process (queues, webhooks) replace
/// this loop with their own consumer; the engine only guarantees that events
/// are published after their transaction commits.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockReserved {
                tenant_id,
                order_line_id,
                quantity,
                backordered,
                ..
            } => {
                info!(
                    tenant_id = %tenant_id,
                    order_line_id = %order_line_id,
                    quantity = quantity,
                    backordered = backordered,
                    "Stock reserved"
                );
            }
            Event::StockReleased {
                tenant_id,
                order_line_id,
                quantity,
            } => {
                info!(
                    tenant_id = %tenant_id,
                    order_line_id = %order_line_id,
                    quantity = quantity,
                    "Stock released"
                );
            }
            Event::StockConsumed {
                tenant_id,
                order_line_id,
                quantity,
            } => {
                info!(
                    tenant_id = %tenant_id,
                    order_line_id = %order_line_id,
                    quantity = quantity,
                    "Stock consumed"
                );
            }
            Event::StockAdjusted {
                tenant_id,
                warehouse_id,
                variant_id,
                qty_delta,
                new_available,
            } => {
                info!(
                    tenant_id = %tenant_id,
                    warehouse_id = %warehouse_id,
                    variant_id = %variant_id,
                    qty_delta = qty_delta,
                    new_available = new_available,
                    "Stock adjusted"
                );
            }
            Event::StockTransferred {
                tenant_id,
                transfer_id,
                quantity,
                ..
            } => {
                info!(
                    tenant_id = %tenant_id,
                    transfer_id = %transfer_id,
                    quantity = quantity,
                    "Stock transferred"
                );
            }
            Event::WarehouseCreated {
                tenant_id,
                warehouse_id,
            } => {
                info!(
                    tenant_id = %tenant_id,
                    warehouse_id = %warehouse_id,
                    "Warehouse created"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}
