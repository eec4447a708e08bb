use async_trait::async_trait;
use redb::{Database as RedbDatabase, ReadableTable, TableDefinition};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::{merge_shallow, normalize_path, RecordStore, RecordStoreError};

/// Records: normalized path -> JSON value (msgpack)
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

#[derive(Debug, Error)]
enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

impl From<DatabaseError> for RecordStoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Deserialization(_) | DatabaseError::Serialization(_) => {
                RecordStoreError::Serialization(e.to_string())
            }
            _ => RecordStoreError::Database(e.to_string()),
        }
    }
}

/// Embedded record store backed by redb, used for local development and tests.
pub struct LocalRecordStore {
    db: Arc<RedbDatabase>,
}

impl Clone for LocalRecordStore {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl LocalRecordStore {
    /// Open or create the record database inside `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, RecordStoreError> {
        Ok(Self::open_inner(data_dir.as_ref())?)
    }

    fn open_inner(data_dir: &Path) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir)?;
        let db = Arc::new(RedbDatabase::create(data_dir.join("movie-hub.redb"))?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn get(&self, path: &str) -> Result<Option<Value>, DatabaseError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        match table.get(path)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, path: &str, record: &Value) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            if record.is_null() {
                table.remove(path)?;
            } else {
                let data = rmp_serde::to_vec_named(record)?;
                table.insert(path, data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read-modify-write inside a single write transaction.
    fn merge(&self, path: &str, partial: Map<String, Value>) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            let existing: Option<Value> = match table.get(path)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            let merged = merge_shallow(existing, partial);
            let data = rmp_serde::to_vec_named(&merged)?;
            table.insert(path, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, RecordStoreError> {
        Ok(self.get(&normalize_path(path))?)
    }

    async fn write(&self, path: &str, record: Value) -> Result<(), RecordStoreError> {
        let path = normalize_path(path);
        self.put(&path, &record)?;
        tracing::debug!(path = %path, "Wrote record");
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        partial: Map<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let path = normalize_path(path);
        self.merge(&path, partial)?;
        tracing::debug!(path = %path, "Updated record");
        Ok(())
    }
}
