//! # Storage Module
//!
//! Persistence for colors, medications and reminders.
//!
//! A backend only implements the record primitives (load, list, save,
//! delete, allocate an id). Everything that involves a rule lives in the
//! provided methods of [`MedicationStore`], so both backends behave the same:
//! - inputs are validated before anything is written
//! - references are checked (a reminder needs its medication, a medication
//!   its color)
//! - deleting a medication deletes its reminders
//! - deleting a color clears it from the medication that used it
//! - an operation that writes several records runs inside
//!   [`MedicationStore::atomically`]: it lands whole or not at all
//!
//! Backends:
//! - [`MemoryStore`]: BTreeMaps, for tests and throwaway servers
//! - [`RedbStore`]: a redb database file, records encoded with postcard

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::model::{
    ColorRecord, Medication, MedicationDetail, MedicationPatch, NewColor, NewMedication,
    NewReminder, Reminder,
};
use crate::submission::MedicationInput;
use crate::{ColorId, MedicationId, MedportError, RecordKind, ReminderId, Result};
use chrono::NaiveDateTime;

/// Record storage with the medication rules layered on top.
pub trait MedicationStore {
    // =========================================================================
    // PRIMITIVES (implemented by each backend)
    // =========================================================================

    /// Hand out the next id for a record kind. Ids start at 1 and are never reused.
    fn allocate_id(&mut self, kind: RecordKind) -> Result<u64>;

    fn load_color(&self, id: ColorId) -> Result<Option<ColorRecord>>;
    fn list_colors(&self) -> Result<Vec<ColorRecord>>;
    fn save_color(&mut self, record: &ColorRecord) -> Result<()>;
    /// Returns whether a record was removed.
    fn delete_color_record(&mut self, id: ColorId) -> Result<bool>;

    fn load_medication(&self, id: MedicationId) -> Result<Option<Medication>>;
    fn list_medications(&self) -> Result<Vec<Medication>>;
    fn save_medication(&mut self, record: &Medication) -> Result<()>;
    fn delete_medication_record(&mut self, id: MedicationId) -> Result<bool>;

    fn load_reminder(&self, id: ReminderId) -> Result<Option<Reminder>>;
    fn list_reminders(&self) -> Result<Vec<Reminder>>;
    fn save_reminder(&mut self, record: &Reminder) -> Result<()>;
    fn delete_reminder_record(&mut self, id: ReminderId) -> Result<bool>;

    /// Run `work` against this store as one unit. When `work` returns an
    /// error, every write it made is undone. Calls nest: an inner call joins
    /// the outer unit.
    fn atomically(&mut self, work: &mut dyn FnMut(&mut dyn MedicationStore) -> Result<()>) -> Result<()>;

    // =========================================================================
    // COLORS
    // =========================================================================

    fn create_color(&mut self, color: NewColor) -> Result<ColorRecord> {
        color.validate()?;
        let id = ColorId(self.allocate_id(RecordKind::Color)?);
        let record = color.into_record(id);
        self.save_color(&record)?;
        Ok(record)
    }

    fn update_color(&mut self, id: ColorId, color: NewColor) -> Result<ColorRecord> {
        color.validate()?;
        if self.load_color(id)?.is_none() {
            return Err(MedportError::not_found(RecordKind::Color, id.0));
        }
        let record = color.into_record(id);
        self.save_color(&record)?;
        Ok(record)
    }

    fn delete_color(&mut self, id: ColorId) -> Result<()> {
        self.atomically(&mut |store| {
            if !store.delete_color_record(id)? {
                return Err(MedportError::not_found(RecordKind::Color, id.0));
            }
            for mut medication in store.list_medications()? {
                if medication.color_id == Some(id) {
                    medication.color_id = None;
                    store.save_medication(&medication)?;
                }
            }
            Ok(())
        })
    }

    // =========================================================================
    // MEDICATIONS
    // =========================================================================

    fn create_medication(&mut self, medication: NewMedication) -> Result<Medication> {
        self.check_medication(&medication)?;
        let id = MedicationId(self.allocate_id(RecordKind::Medication)?);
        let record = medication.into_record(id);
        self.save_medication(&record)?;
        Ok(record)
    }

    fn update_medication(&mut self, id: MedicationId, medication: NewMedication) -> Result<Medication> {
        if self.load_medication(id)?.is_none() {
            return Err(MedportError::not_found(RecordKind::Medication, id.0));
        }
        self.check_medication(&medication)?;
        let record = medication.into_record(id);
        self.save_medication(&record)?;
        Ok(record)
    }

    fn patch_medication(&mut self, id: MedicationId, patch: MedicationPatch) -> Result<Medication> {
        let current = self
            .load_medication(id)?
            .ok_or_else(|| MedportError::not_found(RecordKind::Medication, id.0))?;
        self.update_medication(id, patch.apply(&current))
    }

    /// Delete a medication and every reminder attached to it.
    fn delete_medication(&mut self, id: MedicationId) -> Result<()> {
        self.atomically(&mut |store| {
            if !store.delete_medication_record(id)? {
                return Err(MedportError::not_found(RecordKind::Medication, id.0));
            }
            for reminder in store.reminders_for(id)? {
                store.delete_reminder_record(reminder.id)?;
            }
            Ok(())
        })
    }

    /// Validation plus the color reference check.
    fn check_medication(&self, medication: &NewMedication) -> Result<()> {
        medication.validate()?;
        if let Some(color_id) = medication.color_id {
            if self.load_color(color_id)?.is_none() {
                return Err(MedportError::not_found(RecordKind::Color, color_id.0));
            }
        }
        Ok(())
    }

    // =========================================================================
    // REMINDERS
    // =========================================================================

    fn create_reminder(&mut self, reminder: NewReminder) -> Result<Reminder> {
        self.check_reminder(&reminder)?;
        let id = ReminderId(self.allocate_id(RecordKind::Reminder)?);
        let record = reminder.into_record(id);
        self.save_reminder(&record)?;
        Ok(record)
    }

    fn update_reminder(&mut self, id: ReminderId, reminder: NewReminder) -> Result<Reminder> {
        if self.load_reminder(id)?.is_none() {
            return Err(MedportError::not_found(RecordKind::Reminder, id.0));
        }
        self.check_reminder(&reminder)?;
        let record = reminder.into_record(id);
        self.save_reminder(&record)?;
        Ok(record)
    }

    fn delete_reminder(&mut self, id: ReminderId) -> Result<()> {
        if !self.delete_reminder_record(id)? {
            return Err(MedportError::not_found(RecordKind::Reminder, id.0));
        }
        Ok(())
    }

    fn check_reminder(&self, reminder: &NewReminder) -> Result<()> {
        reminder.validate()?;
        if self.load_medication(reminder.medication_id)?.is_none() {
            return Err(MedportError::not_found(
                RecordKind::Medication,
                reminder.medication_id.0,
            ));
        }
        Ok(())
    }

    /// Reminders of one medication, in id order.
    fn reminders_for(&self, medication: MedicationId) -> Result<Vec<Reminder>> {
        Ok(self
            .list_reminders()?
            .into_iter()
            .filter(|reminder| reminder.medication_id == medication)
            .collect())
    }

    /// Reminders that should have gone off by `now`.
    fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<Reminder>> {
        Ok(self
            .list_reminders()?
            .into_iter()
            .filter(|reminder| reminder.is_due(now))
            .collect())
    }

    // =========================================================================
    // FORM SUBMISSIONS AND JOINED VIEWS
    // =========================================================================

    /// Store a submitted form: its color, the medication and its reminders.
    ///
    /// The whole body is validated first, then written as one unit: a
    /// failure part way leaves no color, medication or reminder behind.
    fn create_from_input(&mut self, input: &MedicationInput) -> Result<MedicationDetail> {
        input.validate()?;
        NewMedication::from_input(input, None)?;
        let reminders = input
            .reminders
            .iter()
            .enumerate()
            .map(|(index, reminder)| NewReminder::from_input(reminder, index, MedicationId(0)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut created = None;
        self.atomically(&mut |store| {
            let color = store.create_color(NewColor::from(&input.color))?;
            let medication =
                store.create_medication(NewMedication::from_input(input, Some(color.id))?)?;

            let mut stored = Vec::with_capacity(reminders.len());
            for reminder in &reminders {
                let mut reminder = reminder.clone();
                reminder.medication_id = medication.id;
                stored.push(store.create_reminder(reminder)?);
            }

            created = Some(MedicationDetail::assemble(medication, Some(color), stored));
            Ok(())
        })?;

        created.ok_or_else(|| MedportError::storage("submission was not stored"))
    }

    fn medication_detail(&self, id: MedicationId) -> Result<Option<MedicationDetail>> {
        let Some(medication) = self.load_medication(id)? else {
            return Ok(None);
        };
        self.assemble_detail(medication).map(Some)
    }

    fn medication_details(&self) -> Result<Vec<MedicationDetail>> {
        self.list_medications()?
            .into_iter()
            .map(|medication| self.assemble_detail(medication))
            .collect()
    }

    fn assemble_detail(&self, medication: Medication) -> Result<MedicationDetail> {
        let color = match medication.color_id {
            Some(color_id) => self.load_color(color_id)?,
            None => None,
        };
        let reminders = self.reminders_for(medication.id)?;
        Ok(MedicationDetail::assemble(medication, color, reminders))
    }
}

// =============================================================================
// SHARED BACKEND TESTS
// =============================================================================

/// Behavior every backend must show; run against each one.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::color::{ColorFields, Rgb};
    use crate::schedule::{TimeInterval, TimeOfDay, WeekdaySet};
    use crate::submission::ReminderInput;

    fn new_medication(name: &str, color_id: Option<ColorId>) -> NewMedication {
        NewMedication {
            name: name.to_string(),
            color_id,
            dosage: 1,
            unit: "pill".to_string(),
            frequency: 2,
            frequency_interval: TimeInterval::Days,
        }
    }

    fn new_reminder(medication_id: MedicationId, hour: u32) -> NewReminder {
        NewReminder {
            medication_id,
            time: TimeOfDay::new(hour, 0).expect("valid time"),
            repeat_interval: TimeInterval::Days,
            repeat_days: WeekdaySet::empty(),
            specific_date: None,
            active: true,
            snooze_duration: 10,
            ends_on: None,
        }
    }

    fn input() -> MedicationInput {
        MedicationInput {
            name: "Metformin".to_string(),
            color: ColorFields::from_rgb("Blue", Rgb::new(0, 0, 255)),
            frequency: 2,
            reminders: vec![
                ReminderInput {
                    time: "20:00".to_string(),
                    ..ReminderInput::default()
                },
                ReminderInput::default(),
            ],
            ..MedicationInput::default()
        }
    }

    /// Passes everything through to `inner`, but the write after
    /// `writes_left` successful ones fails.
    struct FailingWrites<'a> {
        inner: &'a mut dyn MedicationStore,
        writes_left: usize,
    }

    impl FailingWrites<'_> {
        fn spend(&mut self) -> Result<()> {
            if self.writes_left == 0 {
                return Err(MedportError::storage("disk full"));
            }
            self.writes_left -= 1;
            Ok(())
        }
    }

    impl MedicationStore for FailingWrites<'_> {
        fn allocate_id(&mut self, kind: RecordKind) -> Result<u64> {
            self.inner.allocate_id(kind)
        }

        fn load_color(&self, id: ColorId) -> Result<Option<ColorRecord>> {
            self.inner.load_color(id)
        }

        fn list_colors(&self) -> Result<Vec<ColorRecord>> {
            self.inner.list_colors()
        }

        fn save_color(&mut self, record: &ColorRecord) -> Result<()> {
            self.spend()?;
            self.inner.save_color(record)
        }

        fn delete_color_record(&mut self, id: ColorId) -> Result<bool> {
            self.spend()?;
            self.inner.delete_color_record(id)
        }

        fn load_medication(&self, id: MedicationId) -> Result<Option<Medication>> {
            self.inner.load_medication(id)
        }

        fn list_medications(&self) -> Result<Vec<Medication>> {
            self.inner.list_medications()
        }

        fn save_medication(&mut self, record: &Medication) -> Result<()> {
            self.spend()?;
            self.inner.save_medication(record)
        }

        fn delete_medication_record(&mut self, id: MedicationId) -> Result<bool> {
            self.spend()?;
            self.inner.delete_medication_record(id)
        }

        fn load_reminder(&self, id: ReminderId) -> Result<Option<Reminder>> {
            self.inner.load_reminder(id)
        }

        fn list_reminders(&self) -> Result<Vec<Reminder>> {
            self.inner.list_reminders()
        }

        fn save_reminder(&mut self, record: &Reminder) -> Result<()> {
            self.spend()?;
            self.inner.save_reminder(record)
        }

        fn delete_reminder_record(&mut self, id: ReminderId) -> Result<bool> {
            self.spend()?;
            self.inner.delete_reminder_record(id)
        }

        fn atomically(
            &mut self,
            work: &mut dyn FnMut(&mut dyn MedicationStore) -> Result<()>,
        ) -> Result<()> {
            let writes_left = &mut self.writes_left;
            self.inner.atomically(&mut |inner| {
                let mut unit = FailingWrites {
                    inner,
                    writes_left: *writes_left,
                };
                let result = work(&mut unit);
                *writes_left = unit.writes_left;
                result
            })
        }
    }

    pub fn ids_start_at_one_and_increase(store: &mut dyn MedicationStore) {
        let a = store.create_color(NewColor::new("A", Rgb::BLACK)).expect("create");
        let b = store.create_color(NewColor::new("B", Rgb::BLACK)).expect("create");
        assert_eq!(a.id, ColorId(1));
        assert_eq!(b.id, ColorId(2));

        store.delete_color(b.id).expect("delete");
        let c = store.create_color(NewColor::new("C", Rgb::BLACK)).expect("create");
        assert_eq!(c.id, ColorId(3));
    }

    pub fn create_from_input_stores_everything(store: &mut dyn MedicationStore) {
        let detail = store.create_from_input(&input()).expect("create");

        assert_eq!(detail.name, "Metformin");
        assert_eq!(detail.color.as_ref().map(|c| c.hex.as_str()), Some("#0000ff"));
        assert_eq!(detail.reminders.len(), 2);
        assert_eq!(detail.reminders[0].time.to_string(), "09:00");

        let loaded = store.medication_detail(detail.id).expect("load");
        assert_eq!(loaded, Some(detail));
    }

    pub fn invalid_input_writes_nothing(store: &mut dyn MedicationStore) {
        let mut bad = input();
        bad.reminders[1].time = "9 o'clock".to_string();

        let result = store.create_from_input(&bad);
        assert!(matches!(result, Err(MedportError::Validation(_))));
        assert!(store.list_colors().expect("list").is_empty());
        assert!(store.list_medications().expect("list").is_empty());
        assert!(store.list_reminders().expect("list").is_empty());
    }

    pub fn failed_submission_writes_nothing(store: &mut dyn MedicationStore) {
        // color, medication, first reminder; the second reminder fails
        let mut failing = FailingWrites {
            inner: &mut *store,
            writes_left: 3,
        };
        let result = failing.create_from_input(&input());
        assert!(matches!(result, Err(MedportError::Storage(_))));

        assert!(store.list_colors().expect("list").is_empty());
        assert!(store.list_medications().expect("list").is_empty());
        assert!(store.list_reminders().expect("list").is_empty());

        let detail = store.create_from_input(&input()).expect("create");
        assert_eq!(detail.reminders.len(), 2);
    }

    pub fn failed_cascade_keeps_everything(store: &mut dyn MedicationStore) {
        let med = store.create_medication(new_medication("Keep", None)).expect("create");
        store.create_reminder(new_reminder(med.id, 8)).expect("create");
        store.create_reminder(new_reminder(med.id, 9)).expect("create");

        let mut failing = FailingWrites {
            inner: &mut *store,
            writes_left: 2,
        };
        let result = failing.delete_medication(med.id);
        assert!(matches!(result, Err(MedportError::Storage(_))));

        assert!(store.load_medication(med.id).expect("load").is_some());
        assert_eq!(store.reminders_for(med.id).expect("list").len(), 2);
    }

    pub fn failed_color_delete_keeps_references(store: &mut dyn MedicationStore) {
        let color = store.create_color(NewColor::new("Red", Rgb::new(255, 0, 0))).expect("create");
        let first = store.create_medication(new_medication("A", Some(color.id))).expect("create");
        let second = store.create_medication(new_medication("B", Some(color.id))).expect("create");

        let mut failing = FailingWrites {
            inner: &mut *store,
            writes_left: 2,
        };
        let result = failing.delete_color(color.id);
        assert!(matches!(result, Err(MedportError::Storage(_))));

        assert!(store.load_color(color.id).expect("load").is_some());
        for id in [first.id, second.id] {
            let med = store.load_medication(id).expect("load");
            assert_eq!(med.and_then(|m| m.color_id), Some(color.id));
        }
    }

    pub fn delete_medication_cascades(store: &mut dyn MedicationStore) {
        let keep = store.create_medication(new_medication("Keep", None)).expect("create");
        let drop = store.create_medication(new_medication("Drop", None)).expect("create");
        store.create_reminder(new_reminder(keep.id, 8)).expect("create");
        store.create_reminder(new_reminder(drop.id, 9)).expect("create");
        store.create_reminder(new_reminder(drop.id, 10)).expect("create");

        store.delete_medication(drop.id).expect("delete");

        assert!(store.load_medication(drop.id).expect("load").is_none());
        let remaining = store.list_reminders().expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].medication_id, keep.id);
    }

    pub fn delete_color_clears_reference(store: &mut dyn MedicationStore) {
        let color = store.create_color(NewColor::new("Red", Rgb::new(255, 0, 0))).expect("create");
        let med = store.create_medication(new_medication("Aspirin", Some(color.id))).expect("create");

        store.delete_color(color.id).expect("delete");

        let med = store.load_medication(med.id).expect("load");
        assert_eq!(med.map(|m| m.color_id), Some(None));
    }

    pub fn references_are_checked(store: &mut dyn MedicationStore) {
        let orphan = store.create_reminder(new_reminder(MedicationId(42), 8));
        assert!(matches!(
            orphan,
            Err(MedportError::NotFound { kind: RecordKind::Medication, id: 42 })
        ));

        let colorless = store.create_medication(new_medication("X", Some(ColorId(7))));
        assert!(matches!(
            colorless,
            Err(MedportError::NotFound { kind: RecordKind::Color, id: 7 })
        ));
    }

    pub fn update_and_patch(store: &mut dyn MedicationStore) {
        let med = store.create_medication(new_medication("Old", None)).expect("create");

        let updated = store
            .update_medication(med.id, new_medication("New", None))
            .expect("update");
        assert_eq!(updated.name, "New");

        let patched = store
            .patch_medication(
                med.id,
                MedicationPatch {
                    unit: Some("teaspoon".to_string()),
                    ..MedicationPatch::default()
                },
            )
            .expect("patch");
        assert_eq!(patched.name, "New");
        assert_eq!(patched.unit, "teaspoon");

        let missing = store.update_medication(MedicationId(99), new_medication("Y", None));
        assert!(matches!(missing, Err(MedportError::NotFound { .. })));

        let invalid = store.patch_medication(
            med.id,
            MedicationPatch {
                name: Some(String::new()),
                ..MedicationPatch::default()
            },
        );
        assert!(matches!(invalid, Err(MedportError::Validation(_))));
    }

    pub fn reminders_for_filters_by_medication(store: &mut dyn MedicationStore) {
        let a = store.create_medication(new_medication("A", None)).expect("create");
        let b = store.create_medication(new_medication("B", None)).expect("create");
        store.create_reminder(new_reminder(a.id, 8)).expect("create");
        store.create_reminder(new_reminder(b.id, 9)).expect("create");
        store.create_reminder(new_reminder(a.id, 10)).expect("create");

        let for_a = store.reminders_for(a.id).expect("list");
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|r| r.medication_id == a.id));
        assert!(store.reminders_for(MedicationId(50)).expect("list").is_empty());
    }
}
