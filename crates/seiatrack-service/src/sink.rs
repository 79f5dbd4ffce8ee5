//! Outbound event channel.
//!
//! The tracker publishes domain events after every committed mutation; a
//! notification component subscribes on the other side and applies its
//! own rate limiting. The default sink just logs.

use seiatrack_core::DomainEvent;
use tracing::info;

pub trait EventSink: Send + Sync {
    fn publish(&self, event: &DomainEvent);
}

/// Default sink: structured log lines only.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &DomainEvent) {
        info!(?event, "domain event");
    }
}
