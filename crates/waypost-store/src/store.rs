//! Main store implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{Connection, Row};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use waypost_core::{HistorySnapshot, LocationStore, SnapshotFeed, SnapshotSubscription, StoreError};
use waypost_types::{LocationRecord, NewLocation, OperatorId, RecordId};

use crate::error::{Error, Result};
use crate::schema;

/// Clock the store reads when assigning timestamps.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

const SELECT_ORDERED: &str = "SELECT id, timestamp_ns, latitude, longitude, accuracy, altitude, tracker_id \
     FROM locations ORDER BY timestamp_ns, seq";

/// SQLite-based location store.
///
/// Assigns each record a UUID and a timestamp that never goes backwards in
/// append order, then pushes the full ordered set to every subscriber.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: SnapshotFeed,
    clock: Clock,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("subscribers", &self.feed.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::from_connection(conn)
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        schema::initialize(&mut conn)?;
        let records = load_ordered(&conn)?;
        debug!("Loaded {} stored locations", records.len());
        Ok(Self {
            conn: Mutex::new(conn),
            feed: SnapshotFeed::new(HistorySnapshot::new(records)),
            clock: Arc::new(OffsetDateTime::now_utc),
        })
    }

    /// Replace the clock used for new timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Every stored record, ascending by timestamp.
    pub async fn all_records(&self) -> Result<Vec<LocationRecord>> {
        let conn = self.conn.lock().await;
        load_ordered(&conn)
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// The most recent record, if any.
    pub async fn latest(&self) -> Result<Option<LocationRecord>> {
        Ok(self.all_records().await?.pop())
    }

    /// Re-read the table and publish a snapshot if other connections have
    /// added records since the last one.
    ///
    /// Returns whether a new snapshot was published.
    pub async fn reload(&self) -> Result<bool> {
        let conn = self.conn.lock().await;
        let records = load_ordered(&conn)?;
        let known = self.feed.current().map_or(usize::MAX, |s| s.len());
        if records.len() == known {
            return Ok(false);
        }
        debug!("Reloaded {} locations ({} before)", records.len(), known);
        self.feed.publish(HistorySnapshot::new(records));
        Ok(true)
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }

    async fn insert(&self, draft: NewLocation) -> Result<LocationRecord> {
        let conn = self.conn.lock().await;

        let last: Option<i64> =
            conn.query_row("SELECT MAX(timestamp_ns) FROM locations", [], |row| row.get(0))?;
        let now = to_nanos((self.clock)())?;
        let timestamp_ns = last.map_or(now, |last| last.max(now));
        let timestamp = from_nanos(timestamp_ns)?;

        let record = LocationRecord::from_draft(
            RecordId::new(Uuid::new_v4().to_string()),
            timestamp,
            draft,
        );
        conn.execute(
            "INSERT INTO locations (id, timestamp_ns, latitude, longitude, accuracy, altitude, tracker_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.id.as_str(),
                timestamp_ns,
                record.latitude,
                record.longitude,
                record.accuracy,
                record.altitude,
                record.tracker_id.as_str(),
            ],
        )?;
        debug!("Stored location {} at {}", record.id, record.timestamp);

        match load_ordered(&conn) {
            Ok(records) => self.feed.publish(HistorySnapshot::new(records)),
            Err(e) => {
                warn!("Failed to reload locations after append: {}", e);
                self.feed.fail(StoreError::Subscription(e.to_string()));
            }
        }

        Ok(record)
    }
}

#[async_trait]
impl LocationStore for SqliteStore {
    async fn append(&self, draft: NewLocation) -> std::result::Result<LocationRecord, StoreError> {
        Ok(self.insert(draft).await?)
    }

    fn subscribe_ordered(&self) -> std::result::Result<SnapshotSubscription, StoreError> {
        Ok(self.feed.subscribe())
    }
}

fn load_ordered(conn: &Connection) -> Result<Vec<LocationRecord>> {
    let mut stmt = conn.prepare(SELECT_ORDERED)?;
    let rows = stmt
        .query_map([], StoredRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(StoredRow::into_record).collect()
}

struct StoredRow {
    id: String,
    timestamp_ns: i64,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    altitude: Option<f64>,
    tracker_id: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp_ns: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            accuracy: row.get(4)?,
            altitude: row.get(5)?,
            tracker_id: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<LocationRecord> {
        Ok(LocationRecord {
            id: RecordId::new(self.id),
            timestamp: from_nanos(self.timestamp_ns)?,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            altitude: self.altitude,
            tracker_id: OperatorId::new(self.tracker_id),
        })
    }
}

fn to_nanos(ts: OffsetDateTime) -> Result<i64> {
    i64::try_from(ts.unix_timestamp_nanos())
        .map_err(|_| Error::InvalidTimestamp(format!("{ts} does not fit in 64-bit nanoseconds")))
}

fn from_nanos(ns: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ns))
        .map_err(|e| Error::InvalidTimestamp(format!("{ns}: {e}")))
}
