use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by services after successful mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Pricing
    PricingRecalculated {
        variants_updated: usize,
    },
    MetalRatesUpdated,

    // Product location tracking
    ProductAdded {
        location_record_id: i64,
        quantity: i32,
    },
    ProductTransferred {
        from_box_id: i64,
        to_box_id: i64,
        quantity: i32,
    },
    ProductQuantityAdjusted {
        location_record_id: i64,
        old_quantity: i32,
        new_quantity: i32,
    },
    ProductRemoved {
        location_record_id: i64,
        quantity: i32,
    },

    // Billing
    CartCreated(Uuid),
    CartUpdated(Uuid),
    CartHeld(Uuid),
    CartConverted(Uuid),
    InvoiceCreated {
        invoice_id: Uuid,
        invoice_number: String,
    },
    PaymentRecorded {
        invoice_id: Uuid,
        payment_id: Uuid,
    },

    // Content generation
    ContentGenerated {
        sku: String,
    },
}

/// Cloneable handle for publishing events onto the application channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, returning an error string if the channel is closed.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing if no receiver is attached.
    /// Event delivery is best-effort; a dropped event never fails a mutation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Creates an event channel pair with a bounded buffer.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the application event channel for the lifetime of the process.
/// Currently events are logged; downstream consumers attach here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "Event processed");
    }
    info!("Event channel closed");
}
