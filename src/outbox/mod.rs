//! Transactional outbox for note events
//!
//! [`OutboxWriter`] appends an event row inside the same transaction as the
//! note change. [`OutboxDispatcher`] later delivers unsent rows through a
//! [`Publisher`] and flags them sent. Rows are kept forever.

mod dispatcher;
pub mod publisher;
mod writer;

pub use dispatcher::{DispatchSummary, DispatcherHandle, OutboxDispatcher};
pub use publisher::{HttpPublisher, LogPublisher, OutboxMessage, PublishError, Publisher};
pub use writer::{OutboxError, OutboxEvent, OutboxWriter};
