//! # Redb Backend
//!
//! Disk-backed store on a single redb database file.
//!
//! Layout:
//! - one table per record kind, `u64` id -> postcard bytes
//! - a `meta` table holding the last id handed out per kind
//!
//! A lone primitive runs in its own transaction. [`MedicationStore::atomically`]
//! opens one write transaction and hands `work` a `TxnStore` over it, so
//! every write inside commits together or is aborted together.

use super::MedicationStore;
use crate::model::{ColorRecord, Medication, Reminder};
use crate::{ColorId, MedicationId, MedportError, RecordKind, ReminderId, Result};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

const COLORS: RecordTable = TableDefinition::new("colors");
const MEDICATIONS: RecordTable = TableDefinition::new("medications");
const REMINDERS: RecordTable = TableDefinition::new("reminders");
const META: TableDefinition<'static, &'static str, u64> = TableDefinition::new("meta");

fn counter_key(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Color => "last_color_id",
        RecordKind::Medication => "last_medication_id",
        RecordKind::Reminder => "last_reminder_id",
    }
}

// =============================================================================
// TABLE ACCESS
// =============================================================================

fn decode_one<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>> {
    let Some(bytes) = table.get(id).map_err(MedportError::storage)? else {
        return Ok(None);
    };
    Ok(Some(postcard::from_bytes(bytes.value())?))
}

fn decode_all<T: DeserializeOwned>(table: &impl ReadableTable<u64, &'static [u8]>) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for entry in table.iter().map_err(MedportError::storage)? {
        let (_id, bytes) = entry.map_err(MedportError::storage)?;
        records.push(postcard::from_bytes(bytes.value())?);
    }
    Ok(records)
}

fn get<T: DeserializeOwned>(txn: &WriteTransaction, table: RecordTable, id: u64) -> Result<Option<T>> {
    let table = txn.open_table(table).map_err(MedportError::storage)?;
    decode_one(&table, id)
}

fn get_all<T: DeserializeOwned>(txn: &WriteTransaction, table: RecordTable) -> Result<Vec<T>> {
    let table = txn.open_table(table).map_err(MedportError::storage)?;
    decode_all(&table)
}

fn put<T: Serialize>(txn: &WriteTransaction, table: RecordTable, id: u64, record: &T) -> Result<()> {
    let bytes = postcard::to_allocvec(record)?;
    let mut table = txn.open_table(table).map_err(MedportError::storage)?;
    table
        .insert(id, bytes.as_slice())
        .map_err(MedportError::storage)?;
    Ok(())
}

fn remove(txn: &WriteTransaction, table: RecordTable, id: u64) -> Result<bool> {
    let mut table = txn.open_table(table).map_err(MedportError::storage)?;
    let removed = table.remove(id).map_err(MedportError::storage)?.is_some();
    Ok(removed)
}

fn next_id(txn: &WriteTransaction, kind: RecordKind) -> Result<u64> {
    let key = counter_key(kind);
    let mut meta = txn.open_table(META).map_err(MedportError::storage)?;
    let last = meta
        .get(key)
        .map_err(MedportError::storage)?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = last.saturating_add(1);
    meta.insert(key, next).map_err(MedportError::storage)?;
    Ok(next)
}

// =============================================================================
// STORE
// =============================================================================

/// Store backed by a redb database file.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    /// Open the database at `path`, creating the file and tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(MedportError::storage)?;
        let store = Self { db, path };

        store.in_transaction(|txn| {
            for table in [COLORS, MEDICATIONS, REMINDERS] {
                txn.open_table(table).map_err(MedportError::storage)?;
            }
            txn.open_table(META).map_err(MedportError::storage)?;
            Ok(())
        })?;

        Ok(store)
    }

    /// The database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit when `op` succeeds, abort when it fails.
    fn in_transaction<T>(&self, op: impl FnOnce(&WriteTransaction) -> Result<T>) -> Result<T> {
        let txn = self.db.begin_write().map_err(MedportError::storage)?;
        match op(&txn) {
            Ok(value) => {
                txn.commit().map_err(MedportError::storage)?;
                Ok(value)
            }
            Err(e) => {
                txn.abort().map_err(MedportError::storage)?;
                Err(e)
            }
        }
    }

    fn read<T: DeserializeOwned>(&self, table: RecordTable, id: u64) -> Result<Option<T>> {
        let txn = self.db.begin_read().map_err(MedportError::storage)?;
        let table = txn.open_table(table).map_err(MedportError::storage)?;
        decode_one(&table, id)
    }

    fn read_all<T: DeserializeOwned>(&self, table: RecordTable) -> Result<Vec<T>> {
        let txn = self.db.begin_read().map_err(MedportError::storage)?;
        let table = txn.open_table(table).map_err(MedportError::storage)?;
        decode_all(&table)
    }
}

impl MedicationStore for RedbStore {
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
        self.in_transaction(|txn| next_id(txn, kind))
    }

    fn load_color(&self, id: ColorId) -> Result<Option<ColorRecord>> {
        self.read(COLORS, id.0)
    }

    fn list_colors(&self) -> Result<Vec<ColorRecord>> {
        self.read_all(COLORS)
    }

    fn save_color(&mut self, record: &ColorRecord) -> Result<()> {
        self.in_transaction(|txn| put(txn, COLORS, record.id.0, record))
    }

    fn delete_color_record(&mut self, id: ColorId) -> Result<bool> {
        self.in_transaction(|txn| remove(txn, COLORS, id.0))
    }

    fn load_medication(&self, id: MedicationId) -> Result<Option<Medication>> {
        self.read(MEDICATIONS, id.0)
    }

    fn list_medications(&self) -> Result<Vec<Medication>> {
        self.read_all(MEDICATIONS)
    }

    fn save_medication(&mut self, record: &Medication) -> Result<()> {
        self.in_transaction(|txn| put(txn, MEDICATIONS, record.id.0, record))
    }

    fn delete_medication_record(&mut self, id: MedicationId) -> Result<bool> {
        self.in_transaction(|txn| remove(txn, MEDICATIONS, id.0))
    }

    fn load_reminder(&self, id: ReminderId) -> Result<Option<Reminder>> {
        self.read(REMINDERS, id.0)
    }

    fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.read_all(REMINDERS)
    }

    fn save_reminder(&mut self, record: &Reminder) -> Result<()> {
        self.in_transaction(|txn| put(txn, REMINDERS, record.id.0, record))
    }

    fn delete_reminder_record(&mut self, id: ReminderId) -> Result<bool> {
        self.in_transaction(|txn| remove(txn, REMINDERS, id.0))
    }

    fn atomically(&mut self, work: &mut dyn FnMut(&mut dyn MedicationStore) -> Result<()>) -> Result<()> {
        self.in_transaction(|txn| work(&mut TxnStore { txn }))
    }
}

// =============================================================================
// TRANSACTION VIEW
// =============================================================================

/// The store as seen from inside one open write transaction. Reads see the
/// transaction's own uncommitted writes.
struct TxnStore<'t> {
    txn: &'t WriteTransaction,
}

impl MedicationStore for TxnStore<'_> {
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
        next_id(self.txn, kind)
    }

    fn load_color(&self, id: ColorId) -> Result<Option<ColorRecord>> {
        get(self.txn, COLORS, id.0)
    }

    fn list_colors(&self) -> Result<Vec<ColorRecord>> {
        get_all(self.txn, COLORS)
    }

    fn save_color(&mut self, record: &ColorRecord) -> Result<()> {
        put(self.txn, COLORS, record.id.0, record)
    }

    fn delete_color_record(&mut self, id: ColorId) -> Result<bool> {
        remove(self.txn, COLORS, id.0)
    }

    fn load_medication(&self, id: MedicationId) -> Result<Option<Medication>> {
        get(self.txn, MEDICATIONS, id.0)
    }

    fn list_medications(&self) -> Result<Vec<Medication>> {
        get_all(self.txn, MEDICATIONS)
    }

    fn save_medication(&mut self, record: &Medication) -> Result<()> {
        put(self.txn, MEDICATIONS, record.id.0, record)
    }

    fn delete_medication_record(&mut self, id: MedicationId) -> Result<bool> {
        remove(self.txn, MEDICATIONS, id.0)
    }

    fn load_reminder(&self, id: ReminderId) -> Result<Option<Reminder>> {
        get(self.txn, REMINDERS, id.0)
    }

    fn list_reminders(&self) -> Result<Vec<Reminder>> {
        get_all(self.txn, REMINDERS)
    }

    fn save_reminder(&mut self, record: &Reminder) -> Result<()> {
        put(self.txn, REMINDERS, record.id.0, record)
    }

    fn delete_reminder_record(&mut self, id: ReminderId) -> Result<bool> {
        remove(self.txn, REMINDERS, id.0)
    }

    /// Already inside a transaction: join it.
    fn atomically(&mut self, work: &mut dyn FnMut(&mut dyn MedicationStore) -> Result<()>) -> Result<()> {
        work(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
