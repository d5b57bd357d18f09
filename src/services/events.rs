//! Live catalog change notifications

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::models::book::Book;

/// A change to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "book", rename_all = "snake_case")]
pub enum CatalogEvent {
    BookAdded(Book),
    BookBorrowed(Book),
    BookReturned(Book),
}

impl CatalogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEvent::BookAdded(_) => "book_added",
            CatalogEvent::BookBorrowed(_) => "book_borrowed",
            CatalogEvent::BookReturned(_) => "book_returned",
        }
    }

    pub fn book(&self) -> &Book {
        match self {
            CatalogEvent::BookAdded(book)
            | CatalogEvent::BookBorrowed(book)
            | CatalogEvent::BookReturned(book) => book,
        }
    }
}

/// Fan-out of catalog events to every live subscription
#[derive(Clone)]
pub struct CatalogEvents {
    sender: broadcast::Sender<CatalogEvent>,
}

impl CatalogEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Notify current subscribers. Having no subscribers is not an error.
    pub fn publish(&self, event: CatalogEvent) {
        let name = event.name();
        let book_id = event.book().id;
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::debug!(event = name, %book_id, subscribers = delivered, "Catalog event published");
    }

    /// Start receiving events. Dropping the handle unsubscribes.
    pub fn subscribe(&self) -> CatalogSubscription {
        CatalogSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Handle on a live subscription
pub struct CatalogSubscription {
    receiver: broadcast::Receiver<CatalogEvent>,
}

impl CatalogSubscription {
    /// Wait for the next event; `None` once the publisher is gone.
    /// Events missed by a lagging subscriber are skipped.
    pub async fn next(&mut self) -> Option<CatalogEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Catalog subscriber lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a stream; dropping the stream unsubscribes
    pub fn into_stream(self) -> impl Stream<Item = CatalogEvent> + Send + 'static {
        BroadcastStream::new(self.receiver).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Catalog subscriber lagging, events dropped");
                None
            }
        })
    }
}
