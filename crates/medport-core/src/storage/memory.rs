//! In-memory backend. Nothing survives the process.

use super::MedicationStore;
use crate::model::{ColorRecord, Medication, Reminder};
use crate::{ColorId, MedicationId, RecordKind, ReminderId, Result};
use std::collections::BTreeMap;

/// BTreeMap-backed store; lists come back in id order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    colors: BTreeMap<ColorId, ColorRecord>,
    medications: BTreeMap<MedicationId, Medication>,
    reminders: BTreeMap<ReminderId, Reminder>,
    /// Last id handed out per kind.
    last_ids: BTreeMap<u8, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn kind_slot(kind: RecordKind) -> u8 {
    match kind {
        RecordKind::Color => 0,
        RecordKind::Medication => 1,
        RecordKind::Reminder => 2,
    }
}

impl MedicationStore for MemoryStore {
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
        let last = self.last_ids.entry(kind_slot(kind)).or_insert(0);
        *last = last.saturating_add(1);
        Ok(*last)
    }

    fn load_color(&self, id: ColorId) -> Result<Option<ColorRecord>> {
        Ok(self.colors.get(&id).cloned())
    }

    fn list_colors(&self) -> Result<Vec<ColorRecord>> {
        Ok(self.colors.values().cloned().collect())
    }

    fn save_color(&mut self, record: &ColorRecord) -> Result<()> {
        self.colors.insert(record.id, record.clone());
        Ok(())
    }

    fn delete_color_record(&mut self, id: ColorId) -> Result<bool> {
        Ok(self.colors.remove(&id).is_some())
    }

    fn load_medication(&self, id: MedicationId) -> Result<Option<Medication>> {
        Ok(self.medications.get(&id).cloned())
    }

    fn list_medications(&self) -> Result<Vec<Medication>> {
        Ok(self.medications.values().cloned().collect())
    }

    fn save_medication(&mut self, record: &Medication) -> Result<()> {
        self.medications.insert(record.id, record.clone());
        Ok(())
    }

    fn delete_medication_record(&mut self, id: MedicationId) -> Result<bool> {
        Ok(self.medications.remove(&id).is_some())
    }

    fn load_reminder(&self, id: ReminderId) -> Result<Option<Reminder>> {
        Ok(self.reminders.get(&id).cloned())
    }

    fn list_reminders(&self) -> Result<Vec<Reminder>> {
        Ok(self.reminders.values().cloned().collect())
    }

    fn save_reminder(&mut self, record: &Reminder) -> Result<()> {
        self.reminders.insert(record.id, record.clone());
        Ok(())
    }

    fn delete_reminder_record(&mut self, id: ReminderId) -> Result<bool> {
        Ok(self.reminders.remove(&id).is_some())
    }

    /// Snapshot, run, and put the snapshot back on failure.
    fn atomically(&mut self, work: &mut dyn FnMut(&mut dyn MedicationStore) -> Result<()>) -> Result<()> {
        let snapshot = self.clone();
        let result = work(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}
