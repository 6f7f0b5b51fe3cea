//! Partition/row keyed tables for players, measurements, and the log trail.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use broadside_core::error::ArenaError;

use crate::config::PlayerSeed;

pub const PLAYER_PARTITION: &str = "player";
pub const MEASUREMENT_PARTITION: &str = "tournament";

/// A row addressable by partition and row key.
pub trait Entity: Clone + Send + Sync + 'static {
    fn partition_key(&self) -> &str;
    fn row_key(&self) -> &str;
}

#[async_trait]
pub trait Table<E: Entity>: Send + Sync {
    /// Insert a new row. Fails when the key already exists.
    async fn add(&self, entity: E) -> Result<(), ArenaError>;

    async fn get_single(&self, partition: &str, row: &str) -> Result<Option<E>, ArenaError>;

    /// All rows of a partition, ordered by row key.
    async fn get(&self, partition: &str) -> Result<Vec<E>, ArenaError>;

    /// Overwrite an existing row. Fails when the key does not exist.
    async fn replace(&self, entity: E) -> Result<(), ArenaError>;

    async fn delete(&self, partition: &str, row: &str) -> Result<(), ArenaError>;
}

type Key = (String, String);

fn key_of<E: Entity>(entity: &E) -> Key {
    (
        entity.partition_key().to_string(),
        entity.row_key().to_string(),
    )
}

/// In-memory [`Table`].
pub struct MemoryTable<E> {
    rows: Mutex<BTreeMap<Key, E>>,
}

impl<E: Entity> MemoryTable<E> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
        }
    }

    /// Table pre-filled with `rows`; later rows win on duplicate keys.
    pub fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(|e| (key_of(&e), e)).collect()),
        }
    }
}

impl<E: Entity> Default for MemoryTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Table<E> for MemoryTable<E> {
    async fn add(&self, entity: E) -> Result<(), ArenaError> {
        let key = key_of(&entity);
        let mut rows = self.rows.lock();
        if rows.contains_key(&key) {
            return Err(ArenaError::Storage(format!(
                "entity {}/{} already exists",
                key.0, key.1
            )));
        }
        rows.insert(key, entity);
        Ok(())
    }

    async fn get_single(&self, partition: &str, row: &str) -> Result<Option<E>, ArenaError> {
        let key = (partition.to_string(), row.to_string());
        Ok(self.rows.lock().get(&key).cloned())
    }

    async fn get(&self, partition: &str) -> Result<Vec<E>, ArenaError> {
        let rows = self.rows.lock();
        Ok(rows
            .range((partition.to_string(), String::new())..)
            .take_while(|((p, _), _)| p == partition)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn replace(&self, entity: E) -> Result<(), ArenaError> {
        let key = key_of(&entity);
        let mut rows = self.rows.lock();
        match rows.get_mut(&key) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            },
            None => Err(ArenaError::Storage(format!(
                "entity {}/{} not found",
                key.0, key.1
            ))),
        }
    }

    async fn delete(&self, partition: &str, row: &str) -> Result<(), ArenaError> {
        let key = (partition.to_string(), row.to_string());
        match self.rows.lock().remove(&key) {
            Some(_) => Ok(()),
            None => Err(ArenaError::Storage(format!(
                "entity {partition}/{row} not found"
            ))),
        }
    }
}

/// A player that can be measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub web_api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Entity for PlayerRecord {
    fn partition_key(&self) -> &str {
        PLAYER_PARTITION
    }

    fn row_key(&self) -> &str {
        &self.id
    }
}

impl From<PlayerSeed> for PlayerRecord {
    fn from(seed: PlayerSeed) -> Self {
        Self {
            id: seed.id,
            name: seed.name,
            web_api_url: seed.web_api_url,
            api_key: seed.api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// Latest tournament result for a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMeasurement {
    pub player_id: String,
    pub player_name: String,
    pub avg_number_of_shots: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_measurement: OffsetDateTime,
}

impl Entity for TournamentMeasurement {
    fn partition_key(&self) -> &str {
        MEASUREMENT_PARTITION
    }

    fn row_key(&self) -> &str {
        &self.player_id
    }
}

/// One line of a player's log trail. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub player_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub message: String,
    pub web_api_url: Option<String>,
    #[serde(skip)]
    row_key: String,
}

impl LogEntry {
    pub fn new(player_id: &str, message: impl Into<String>, web_api_url: Option<&str>) -> Self {
        static SEQUENCE: AtomicU64 = AtomicU64::new(0);
        let timestamp = OffsetDateTime::now_utc();
        // Zero-padded so row keys sort lexically in write order.
        let row_key = format!(
            "{:020}-{:012}",
            timestamp.unix_timestamp_nanos().max(0),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );
        Self {
            player_id: player_id.to_string(),
            timestamp,
            message: message.into(),
            web_api_url: web_api_url.map(str::to_string),
            row_key,
        }
    }
}

impl Entity for LogEntry {
    fn partition_key(&self) -> &str {
        &self.player_id
    }

    fn row_key(&self) -> &str {
        &self.row_key
    }
}

/// The tables the engine writes to.
#[derive(Clone)]
pub struct Stores {
    pub players: Arc<dyn Table<PlayerRecord>>,
    pub measurements: Arc<dyn Table<TournamentMeasurement>>,
    pub logs: Arc<dyn Table<LogEntry>>,
}

impl Stores {
    pub fn in_memory(players: impl IntoIterator<Item = PlayerRecord>) -> Self {
        Self {
            players: Arc::new(MemoryTable::with_rows(players)),
            measurements: Arc::new(MemoryTable::new()),
            logs: Arc::new(MemoryTable::new()),
        }
    }

    pub async fn append_log(
        &self,
        player_id: &str,
        message: impl Into<String>,
        web_api_url: Option<&str>,
    ) -> Result<(), ArenaError> {
        self.logs
            .add(LogEntry::new(player_id, message, web_api_url))
            .await
    }

    /// Insert the measurement, or update it if the player already has one.
    pub async fn upsert_measurement(
        &self,
        measurement: TournamentMeasurement,
    ) -> Result<(), ArenaError> {
        let existing = self
            .measurements
            .get_single(MEASUREMENT_PARTITION, &measurement.player_id)
            .await?;
        match existing {
            Some(_) => self.measurements.replace(measurement).await,
            None => self.measurements.add(measurement).await,
        }
    }
}
