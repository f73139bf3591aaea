use crate::model::{Quote, StoreError, StoredQuote};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{task, time};
use tracing::warn;

/// VM instructions between cancellation checks.
const PROGRESS_OPS: i32 = 1000;

const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const CANCELLED: u8 = 2;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS quote (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bid DECIMAL(10, 4) NOT NULL,
        timestamp BIGINT NOT NULL,
        create_date DATETIME NOT NULL DEFAULT (CURRENT_TIMESTAMP)
    );
"#;

/// Append-only log of observed quotes.
///
/// Implementations do not deduplicate; callers decide what is worth
/// appending.
#[rocket::async_trait]
pub trait QuoteStore: Send + Sync {
    /// The record with the highest id, `None` when nothing was stored yet.
    async fn most_recent(&self) -> Result<Option<StoredQuote>, StoreError>;

    /// Fails with no row added, or succeeds with exactly one.
    async fn append(&self, quote: &Quote) -> Result<StoredQuote, StoreError>;
}

/// SQLite backed [`QuoteStore`] owning a single connection for the
/// lifetime of one request.
///
/// Concurrent requests each hold their own connection and rely on SQLite's
/// locking, so two requests may both see the same latest row and append the
/// same quote twice.
pub struct QuoteRepository {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl QuoteRepository {
    pub fn new(conn: Connection, timeout: Duration) -> QuoteRepository {
        QuoteRepository {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        }
    }

    /// Creates the quote table if it's missing. Must run before the first
    /// read or write on a fresh database.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            conn.execute_batch(CREATE_TABLE)
                .map_err(StoreError::Bootstrap)
        })
        .await
        .map_err(StoreError::Task)?
    }

    /// Runs `op` in its own transaction on a blocking thread.
    ///
    /// When the deadline passes first, a statement in flight is aborted
    /// through the progress handler and the transaction is rolled back. An
    /// op that already claimed its commit is awaited and its result stands,
    /// so `Timeout` always means nothing was written.
    async fn run<T, F>(&self, behavior: TransactionBehavior, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let task_state = state.clone();

        let mut task = task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;

            if task_state.load(Ordering::SeqCst) == CANCELLED {
                return Err(StoreError::Cancelled);
            }

            let handler_state = task_state.clone();
            conn.progress_handler(
                PROGRESS_OPS,
                Some(move || handler_state.load(Ordering::SeqCst) == CANCELLED),
            );
            let res = transact(&mut *conn, behavior, &task_state, op);
            conn.progress_handler(0, None::<fn() -> bool>);
            res
        });

        match time::timeout(self.timeout, &mut task).await {
            Ok(res) => res.map_err(StoreError::Task)?,
            Err(_) => {
                let cancel =
                    state.compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst);

                if cancel.is_err() {
                    // Already committing.
                    return task.await.map_err(StoreError::Task)?;
                }

                warn!(timeout = ?self.timeout, "Database operation cancelled");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

fn transact<T, F>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    state: &AtomicU8,
    op: F,
) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let tx = conn
        .transaction_with_behavior(behavior)
        .map_err(StoreError::Query)?;
    let value = op(&tx).map_err(StoreError::Query)?;

    // Dropping `tx` rolls back.
    if state
        .compare_exchange(RUNNING, COMMITTING, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(StoreError::Cancelled);
    }

    tx.commit().map_err(StoreError::Query)?;
    Ok(value)
}

#[rocket::async_trait]
impl QuoteStore for QuoteRepository {
    async fn most_recent(&self) -> Result<Option<StoredQuote>, StoreError> {
        self.run(TransactionBehavior::Deferred, |conn| {
            conn.query_row(
                "SELECT id, bid, timestamp, create_date FROM quote ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(StoredQuote {
                        id: row.get(0)?,
                        quote: Quote {
                            bid: row.get(1)?,
                            timestamp: row.get(2)?,
                            create_date: row.get(3)?,
                        },
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn append(&self, quote: &Quote) -> Result<StoredQuote, StoreError> {
        let quote = quote.clone();
        self.run(TransactionBehavior::Immediate, move |conn| {
            let query = "INSERT INTO quote (bid, timestamp, create_date) VALUES (?, ?, ?)";
            conn.execute(query, params![quote.bid, quote.timestamp, quote.create_date])?;
            Ok(StoredQuote {
                id: conn.last_insert_rowid(),
                quote,
            })
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::{QuoteRepository, QuoteStore};
    use crate::{
        model::StoreError,
        test::{db, file_db, quote},
    };
    use rusqlite::{Connection, TransactionBehavior};
    use std::{sync::Arc, time::Duration};
    use tokio::time::sleep;

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM quote", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn most_recent_on_empty_table() {
        let (db, _keepalive) = db();
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();
        assert_eq!(None, repo.most_recent().await.unwrap());
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let (db, keepalive) = db();
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();
        repo.append(&quote(5.43, 1000)).await.unwrap();
        repo.bootstrap().await.unwrap();
        let count: i64 = keepalive
            .query_row("SELECT count(*) FROM quote", [], |row| row.get(0))
            .unwrap();
        assert_eq!(1, count);
    }

    #[tokio::test]
    async fn append() {
        let (db, _keepalive) = db();
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();
        let row = quote(5.43, 1000);
        let res = repo.append(&row).await.unwrap();
        assert_eq!(1, res.id);
        assert_eq!(row, res.quote);
        assert_eq!(Some(res), repo.most_recent().await.unwrap());
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let (db, _keepalive) = db();
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();
        let mut last_id = 0;

        for timestamp in &[1000, 1000, 999, 1001] {
            let res = repo.append(&quote(5.0, *timestamp)).await.unwrap();
            assert!(res.id > last_id);
            last_id = res.id;
        }

        let latest = repo.most_recent().await.unwrap().unwrap();
        assert_eq!(last_id, latest.id);
        assert_eq!(1001, latest.quote.timestamp);
        assert_eq!(5.0, latest.quote.bid);
    }

    #[tokio::test]
    async fn rows_survive_the_connection() {
        let (db, _keepalive) = db();
        {
            let repo = db.connect().await.unwrap();
            repo.bootstrap().await.unwrap();
            repo.append(&quote(5.43, 1000)).await.unwrap();
        }
        let repo = db.connect().await.unwrap();
        let latest = repo.most_recent().await.unwrap().unwrap();
        assert_eq!(quote(5.43, 1000), latest.quote);
    }

    #[tokio::test]
    async fn most_recent_without_table() {
        let (db, _keepalive) = db();
        let repo = db.connect().await.unwrap();
        let res = repo.most_recent().await;
        assert!(matches!(res, Err(StoreError::Query(_))));
    }

    #[tokio::test]
    async fn slow_query_is_interrupted() {
        let conn = Connection::open_in_memory().unwrap();
        let repo = QuoteRepository::new(conn, Duration::from_millis(20));
        repo.bootstrap().await.unwrap();

        let res = repo
            .run(TransactionBehavior::Deferred, |conn| {
                conn.query_row(
                    "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n) \
                     SELECT count(*) FROM n",
                    [],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await;
        assert!(matches!(res, Err(StoreError::Timeout(_))));

        // The aborted statement gives the connection back.
        let conn = repo.conn.clone();
        let count = tokio::task::spawn_blocking(move || {
            conn.lock()
                .unwrap()
                .query_row("SELECT count(*) FROM quote", [], |row| row.get::<_, i64>(0))
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(0, count);
    }

    #[tokio::test]
    async fn append_under_write_lock_times_out_without_writing() {
        let (db, _dir) = file_db(Duration::from_millis(20));
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();

        let holder = Connection::open(db.url()).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let res = repo.append(&quote(5.43, 1000)).await;
        assert!(matches!(res, Err(StoreError::Timeout(_))), "{:?}", res);

        sleep(Duration::from_millis(200)).await;
        holder.execute_batch("COMMIT").unwrap();

        assert_eq!(0, count(&holder));
        // The cancelled task has let go of the connection.
        assert_eq!(1, Arc::strong_count(&repo.conn));
        assert_eq!(None, repo.most_recent().await.unwrap());
    }

    #[tokio::test]
    async fn most_recent_under_exclusive_lock_times_out() {
        let (db, _dir) = file_db(Duration::from_millis(20));
        let repo = db.connect().await.unwrap();
        repo.bootstrap().await.unwrap();

        let holder = Connection::open(db.url()).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let res = repo.most_recent().await;
        assert!(matches!(res, Err(StoreError::Timeout(_))), "{:?}", res);

        holder.execute_batch("COMMIT").unwrap();
        assert_eq!(0, count(&holder));
        assert_eq!(None, repo.most_recent().await.unwrap());
    }
}
