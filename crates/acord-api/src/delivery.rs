//! # Downstream Delivery
//!
//! Accepted transactions are handed to a [`DeliverySink`] for asynchronous
//! processing. The dispatcher never waits for downstream completion: the
//! HTTP response reflects only decoding and validation. A sink that cannot
//! take a message reports it immediately, and the request fails as an
//! internal error. There are no retries at this layer.
//!
//! [`QueueSink`] is a bounded in-process FIFO drained by
//! [`run_delivery_worker`]. Messages keep their submission order; the
//! transaction kind is the message group.

use acord_core::{CanonicalDocument, TransactionKind};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A validated transaction bound for downstream processing.
#[derive(Debug, Clone)]
pub struct DeliveryMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Transaction kind, used as the message group.
    pub kind: TransactionKind,
    /// Correlation id echoed to the caller.
    pub correlation_id: String,
    /// When the gateway accepted the request.
    pub received_at: DateTime<Utc>,
    /// The decoded, validated document.
    pub document: CanonicalDocument,
}

impl DeliveryMessage {
    /// New message with a fresh id.
    pub fn new(
        kind: TransactionKind,
        correlation_id: impl Into<String>,
        received_at: DateTime<Utc>,
        document: CanonicalDocument,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            correlation_id: correlation_id.into(),
            received_at,
            document,
        }
    }
}

/// Hand-off failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The queue is at capacity.
    #[error("delivery queue is full (capacity {capacity})")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },

    /// The consumer has shut down.
    #[error("delivery queue is closed")]
    Closed,
}

/// Destination for accepted transactions. `submit` must not block.
pub trait DeliverySink: Send + Sync {
    /// Enqueue `message`, or report why it could not be taken.
    fn submit(&self, message: DeliveryMessage) -> Result<(), DeliveryError>;
}

/// Bounded `tokio` channel sink.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<DeliveryMessage>,
    capacity: usize,
}

impl QueueSink {
    /// Create a sink and the receiver its worker drains.
    ///
    /// A zero capacity is raised to one.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DeliveryMessage>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, rx)
    }
}

impl DeliverySink for QueueSink {
    fn submit(&self, message: DeliveryMessage) -> Result<(), DeliveryError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Drain `rx` until every sender is dropped.
pub async fn run_delivery_worker(mut rx: mpsc::Receiver<DeliveryMessage>) {
    tracing::info!("delivery worker started");
    while let Some(message) = rx.recv().await {
        let kind = message.kind.to_string();
        tracing::info!(
            message_id = %message.id,
            message_group = %kind,
            correlation_id = %message.correlation_id,
            received_at = %message.received_at.to_rfc3339(),
            root = message.document.root().name(),
            "transaction handed to downstream queue"
        );
        metrics::counter!("acord_deliveries_total", "kind" => kind).increment(1);
    }
    tracing::info!("delivery worker stopped");
}
