//! # Medication Form State
//!
//! The in-memory state behind the "Add New Medication" form: one user edits
//! it, it is validated, serialized once on submit, and reset after a
//! successful submission.
//!
//! Edits made through [`ColorFields`]' setters keep hex and channels in
//! sync. The fields themselves are public (the body deserializes straight
//! into them), so a direct write can split the two; [`MedicationForm::validate`]
//! reports that as a `color` error and the form is not sent.

use crate::color::ColorFields;
use crate::schedule::TimeInterval;
use crate::submission::{MedicationInput, ReminderInput};
use crate::validation::ValidationErrors;

/// Editable medication form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationForm {
    values: MedicationInput,
}

impl MedicationForm {
    /// A form holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled with an existing submission body.
    #[must_use]
    pub fn from_input(values: MedicationInput) -> Self {
        Self { values }
    }

    /// Current values, as they would be submitted.
    #[must_use]
    pub fn values(&self) -> &MedicationInput {
        &self.values
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.values.name = name.into();
    }

    #[must_use]
    pub fn color(&self) -> &ColorFields {
        &self.values.color
    }

    pub fn color_mut(&mut self) -> &mut ColorFields {
        &mut self.values.color
    }

    pub fn set_frequency(&mut self, frequency: i64) {
        self.values.frequency = frequency;
    }

    pub fn set_frequency_interval(&mut self, interval: TimeInterval) {
        self.values.frequency_interval = interval;
    }

    /// The line shown under the frequency selector, e.g. `2x per day`.
    #[must_use]
    pub fn frequency_summary(&self) -> String {
        format!(
            "{}x per {}",
            self.values.frequency,
            self.values.frequency_interval.unit()
        )
    }

    // -------------------------------------------------------------------------
    // Reminder sub-forms
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn reminders(&self) -> &[ReminderInput] {
        &self.values.reminders
    }

    /// Append a reminder with default values; returns its index.
    pub fn add_reminder(&mut self) -> usize {
        self.values.reminders.push(ReminderInput::default());
        self.values.reminders.len() - 1
    }

    /// Remove the reminder at `index`. Later reminders shift down.
    pub fn remove_reminder(&mut self, index: usize) -> Option<ReminderInput> {
        (index < self.values.reminders.len()).then(|| self.values.reminders.remove(index))
    }

    pub fn reminder_mut(&mut self, index: usize) -> Option<&mut ReminderInput> {
        self.values.reminders.get_mut(index)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Check the schema; on success, return the body to submit.
    pub fn validate(&self) -> Result<&MedicationInput, ValidationErrors> {
        self.values.validate().map(|()| &self.values)
    }

    /// Restore the defaults.
    pub fn reset(&mut self) {
        self.values = MedicationInput::default();
    }
}

// =============================================================================
// TESTS
// =============================================================================
