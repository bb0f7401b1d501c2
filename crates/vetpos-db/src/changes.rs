//! # Change Notifications
//!
//! Every committed write announces which table it touched. Screens keep
//! their row sets current by listening instead of polling.
//!
//! ```text
//! repository write ──┐
//! checkout commit ───┼──► ChangeFeed (broadcast, 256) ──► live queries
//! import commit ─────┘                                   (re-read + watch)
//! ```
//!
//! Notifications carry no row data. A subscriber that lags behind and
//! misses messages simply re-reads everything it shows.

use tokio::sync::broadcast;
use tracing::trace;

use crate::table::Table;

/// Capacity of the change channel.
const CHANNEL_CAPACITY: usize = 256;

/// A table was written and committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub table: Table,
}

/// Sender side of the change channel, shared by every repository.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        ChangeFeed { tx }
    }

    /// Announces a committed write. No subscribers is not an error.
    pub fn notify(&self, table: Table) {
        trace!(%table, "Store change");
        let _ = self.tx.send(StoreChange { table });
    }

    /// Announces several tables, each once.
    pub fn notify_all(&self, tables: impl IntoIterator<Item = Table>) {
        let mut seen = Vec::new();
        for table in tables {
            if !seen.contains(&table) {
                seen.push(table);
                self.notify(table);
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_all_dedups() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.notify_all([Table::Products, Table::Sales, Table::Products]);

        assert_eq!(rx.recv().await.unwrap().table, Table::Products);
        assert_eq!(rx.recv().await.unwrap().table, Table::Sales);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_subscribers() {
        ChangeFeed::new().notify(Table::Clients);
    }
}
