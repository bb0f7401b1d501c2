//! # Live Queries
//!
//! Keeps a screen's rows current without explicit refreshes.
//!
//! ```text
//! ┌──────────┐ StoreChange  ┌─────────────────────┐  re-read   ┌──────────┐
//! │ Database │ ───────────► │  refresh task       │ ─────────► │ Database │
//! │ (writes) │  broadcast   │  (tables filter)    │            └──────────┘
//! └──────────┘              └──────────┬──────────┘
//!                                      │ watch::send(rows)
//!                                      ▼
//!                               ┌─────────────┐
//!                               │  LiveQuery  │  screens read .current()
//!                               └─────────────┘
//! ```
//!
//! The task subscribes before the first read, so a write racing with the
//! initial load is never missed. A lagged subscriber re-reads; any import
//! merge or checkout therefore shows up on the next notification.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vetpos_db::{Database, DbResult, Table};

/// Rows of type `T`, re-read whenever one of its tables changes.
///
/// Dropping the query stops its refresh task.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Send + Sync + 'static,
{
    /// Loads the rows once and starts following `tables`.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let debtors = LiveQuery::spawn(db.clone(), &[Table::Clients], |db| async move {
    ///     db.clients().with_debt().await
    /// })
    /// .await?;
    /// ```
    pub async fn spawn<F, Fut>(db: Database, tables: &[Table], load: F) -> DbResult<Self>
    where
        F: Fn(Database) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
    {
        let mut changes = db.subscribe();
        let initial = load(db.clone()).await?;
        let (tx, rx) = watch::channel(initial);

        let tables: Arc<[Table]> = Arc::from(tables);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,

                    msg = changes.recv() => {
                        match msg {
                            Ok(change) if !tables.contains(&change.table) => continue,
                            Ok(change) => debug!(table = %change.table, "Live query refresh"),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                debug!(skipped, "Live query lagged, re-reading");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }

                        drain(&mut changes);

                        match load(db.clone()).await {
                            Ok(rows) => {
                                if tx.send(rows).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, "Live query reload failed, keeping last rows"),
                        }
                    }
                }
            }
            debug!("Live query stopped");
        });

        Ok(LiveQuery { rx, task })
    }

    /// Borrows the latest rows.
    pub fn current(&self) -> watch::Ref<'_, T> {
        self.rx.borrow()
    }

    /// A receiver for screens that await updates themselves.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }

    /// Waits for the next published value. Errors once the task has stopped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Skips notifications already queued; one re-read covers them all.
fn drain(changes: &mut broadcast::Receiver<vetpos_db::StoreChange>) {
    loop {
        match changes.try_recv() {
            Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vetpos_core::{Client, Product};
    use vetpos_db::DbConfig;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn next(query: &mut LiveQuery<Vec<Client>>) {
        tokio::time::timeout(Duration::from_secs(2), query.changed())
            .await
            .expect("live query did not refresh")
            .unwrap();
    }

    #[tokio::test]
    async fn test_observes_writes() {
        let db = test_db().await;
        let mut clients = LiveQuery::spawn(db.clone(), &[Table::Clients], |db| async move {
            db.clients().list_all().await
        })
        .await
        .unwrap();
        assert!(clients.current().is_empty());

        db.clients().insert(&Client::new("Ana Torres")).await.unwrap();
        next(&mut clients).await;

        assert_eq!(clients.current().len(), 1);
        assert_eq!(clients.current()[0].name, "Ana Torres");
    }

    #[tokio::test]
    async fn test_ignores_other_tables() {
        let db = test_db().await;
        let mut clients = LiveQuery::spawn(db.clone(), &[Table::Clients], |db| async move {
            db.clients().list_all().await
        })
        .await
        .unwrap();

        db.products()
            .insert(&Product::new("Kibble", "Food", 2500))
            .await
            .unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(200), clients.changed()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_sees_import_merge() {
        let source = test_db().await;
        source.clients().insert(&Client::new("Luis Paredes")).await.unwrap();
        let (bytes, _) = source.backup().export_to_bytes().await.unwrap();

        let db = test_db().await;
        let mut clients = LiveQuery::spawn(db.clone(), &[Table::Clients], |db| async move {
            db.clients().list_all().await
        })
        .await
        .unwrap();

        db.backup().import_bytes(&bytes).await.unwrap();
        next(&mut clients).await;
        assert_eq!(clients.current()[0].name, "Luis Paredes");
    }
}
