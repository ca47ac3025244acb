//! # Stored Records
//!
//! Colors, medications and reminders as the backend keeps them.
//!
//! Records reference each other by id:
//! - a medication points at (at most) one color
//! - a reminder belongs to exactly one medication
//!
//! `New*` types carry everything but the id and are what create/update
//! operations accept. [`MedicationDetail`] is the joined view returned by
//! the API.

use crate::color::{ColorFields, Rgb, rgb_to_hex};
use crate::schedule::{TimeInterval, TimeOfDay, WeekdaySet};
use crate::submission::{
    MAX_NAME_CHARS, MSG_FREQUENCY_POSITIVE, MSG_FREQUENCY_TOO_LARGE, MSG_INVALID_TIME,
    MSG_NAME_REQUIRED, MSG_NAME_TOO_LONG, MSG_SNOOZE_POSITIVE,
    MedicationInput, ReminderInput,
};
use crate::validation::ValidationErrors;
use crate::{ColorId, MedicationId, ReminderId};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize};

/// Name given to colors saved without one.
pub const DEFAULT_COLOR_NAME: &str = "Untitled";

/// Unit used when a medication does not say what one dose is.
pub const DEFAULT_UNIT: &str = "_";

/// Snooze used when a reminder does not specify one, in minutes.
pub const DEFAULT_SNOOZE_MINUTES: u16 = 10;

// =============================================================================
// COLOR
// =============================================================================

/// A color to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewColor {
    #[serde(default)]
    pub name: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl NewColor {
    #[must_use]
    pub fn new(name: impl Into<String>, rgb: Rgb) -> Self {
        Self {
            name: name.into(),
            red: rgb.red,
            green: rgb.green,
            blue: rgb.blue,
        }
    }

    #[must_use]
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.red, self.green, self.blue)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.name.chars().count() > MAX_NAME_CHARS, "name", MSG_NAME_TOO_LONG);
        errors.into_result(())
    }

    /// Attach an id. Blank names become [`DEFAULT_COLOR_NAME`].
    #[must_use]
    pub fn into_record(self, id: ColorId) -> ColorRecord {
        let name = if self.name.trim().is_empty() {
            DEFAULT_COLOR_NAME.to_string()
        } else {
            self.name
        };
        ColorRecord {
            id,
            name,
            hex: rgb_to_hex(Rgb::new(self.red, self.green, self.blue)),
            red: self.red,
            green: self.green,
            blue: self.blue,
        }
    }
}

impl From<&ColorFields> for NewColor {
    fn from(fields: &ColorFields) -> Self {
        Self::new(fields.name.trim(), fields.rgb())
    }
}

/// A stored color. `hex` is derived from the channels when the record is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRecord {
    pub id: ColorId,
    pub name: String,
    pub hex: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

// =============================================================================
// MEDICATION
// =============================================================================

fn default_dosage() -> u16 {
    1
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// A medication to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    /// How much is taken per dose, counted in `unit`.
    #[serde(default = "default_dosage")]
    pub dosage: u16,
    /// What one dose is (pill, teaspoon, ...).
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Doses per `frequency_interval`.
    pub frequency: u16,
    #[serde(default)]
    pub frequency_interval: TimeInterval,
}

impl NewMedication {
    /// Build from a submission body, checking the numeric ranges.
    pub fn from_input(input: &MedicationInput, color_id: Option<ColorId>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let frequency = u16::try_from(input.frequency).unwrap_or_else(|_| {
            let message = if input.frequency < 1 {
                MSG_FREQUENCY_POSITIVE
            } else {
                MSG_FREQUENCY_TOO_LARGE
            };
            errors.add("frequency", message);
            0
        });

        let medication = Self {
            name: input.name.trim().to_string(),
            color_id,
            dosage: default_dosage(),
            unit: default_unit(),
            frequency,
            frequency_interval: input.frequency_interval,
        };
        let medication = errors.into_result(medication)?;
        medication_checked(medication)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.name.trim().is_empty(), "name", MSG_NAME_REQUIRED);
        errors.check(self.name.chars().count() > MAX_NAME_CHARS, "name", MSG_NAME_TOO_LONG);
        errors.check(self.dosage < 1, "dosage", "Dosage must be positive");
        errors.check(self.unit.trim().is_empty(), "unit", "Unit is required");
        errors.check(self.unit.chars().count() > MAX_NAME_CHARS, "unit", "Unit must be at most 255 characters");
        errors.check(self.frequency < 1, "frequency", MSG_FREQUENCY_POSITIVE);
        errors.into_result(())
    }

    #[must_use]
    pub fn into_record(self, id: MedicationId) -> Medication {
        Medication {
            id,
            name: self.name,
            color_id: self.color_id,
            dosage: self.dosage,
            unit: self.unit,
            frequency: self.frequency,
            frequency_interval: self.frequency_interval,
        }
    }
}

fn medication_checked(medication: NewMedication) -> Result<NewMedication, ValidationErrors> {
    medication.validate().map(|()| medication)
}

/// A stored medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub name: String,
    pub color_id: Option<ColorId>,
    pub dosage: u16,
    pub unit: String,
    pub frequency: u16,
    pub frequency_interval: TimeInterval,
}

impl Medication {
    /// The fields of this record without its id.
    #[must_use]
    pub fn to_new(&self) -> NewMedication {
        NewMedication {
            name: self.name.clone(),
            color_id: self.color_id,
            dosage: self.dosage,
            unit: self.unit.clone(),
            frequency: self.frequency,
            frequency_interval: self.frequency_interval,
        }
    }
}

/// A partial update; absent fields keep their current value.
///
/// `color_id` has three states: absent keeps the color, `null` detaches it,
/// an id replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicationPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color_id: Option<Option<ColorId>>,
    pub dosage: Option<u16>,
    pub unit: Option<String>,
    pub frequency: Option<u16>,
    pub frequency_interval: Option<TimeInterval>,
}

impl MedicationPatch {
    /// Merge the patch over an existing record.
    #[must_use]
    pub fn apply(self, current: &Medication) -> NewMedication {
        let base = current.to_new();
        NewMedication {
            name: self.name.unwrap_or(base.name),
            color_id: self.color_id.unwrap_or(base.color_id),
            dosage: self.dosage.unwrap_or(base.dosage),
            unit: self.unit.unwrap_or(base.unit),
            frequency: self.frequency.unwrap_or(base.frequency),
            frequency_interval: self.frequency_interval.unwrap_or(base.frequency_interval),
        }
    }
}

/// A field that is present, even as `null`, becomes `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// REMINDER
// =============================================================================

fn default_active() -> bool {
    true
}

fn default_snooze() -> u16 {
    DEFAULT_SNOOZE_MINUTES
}

/// A reminder to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub medication_id: MedicationId,
    pub time: TimeOfDay,
    #[serde(default)]
    pub repeat_interval: TimeInterval,
    #[serde(default)]
    pub repeat_days: WeekdaySet,
    #[serde(default)]
    pub specific_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Minutes.
    #[serde(default = "default_snooze")]
    pub snooze_duration: u16,
    /// Last day the reminder fires.
    #[serde(default)]
    pub ends_on: Option<NaiveDate>,
}

impl NewReminder {
    /// Build from the reminder sub-form at `index`.
    pub fn from_input(
        input: &ReminderInput,
        index: usize,
        medication_id: MedicationId,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        input.validate_into(index, &mut errors);

        let time = TimeOfDay::parse(&input.time);
        let snooze = u16::try_from(input.snooze_duration).ok();
        match (time, snooze) {
            (Some(time), Some(snooze_duration)) if errors.is_empty() => Ok(Self {
                medication_id,
                time,
                repeat_interval: input.repeat_interval,
                repeat_days: input.repeat_days,
                specific_date: input.specific_date,
                active: input.active,
                snooze_duration,
                ends_on: None,
            }),
            _ => {
                if errors.is_empty() {
                    errors.add(format!("reminders.{}", index), MSG_INVALID_TIME);
                }
                Err(errors)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.snooze_duration < 1, "snooze_duration", MSG_SNOOZE_POSITIVE);
        if let (Some(ends_on), Some(date)) = (self.ends_on, self.specific_date) {
            errors.check(ends_on < date, "ends_on", "End date is before the reminder date");
        }
        errors.into_result(())
    }

    #[must_use]
    pub fn into_record(self, id: ReminderId) -> Reminder {
        Reminder {
            id,
            medication_id: self.medication_id,
            time: self.time,
            repeat_interval: self.repeat_interval,
            repeat_days: self.repeat_days,
            specific_date: self.specific_date,
            active: self.active,
            snooze_duration: self.snooze_duration,
            ends_on: self.ends_on,
        }
    }
}

/// A stored reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub medication_id: MedicationId,
    pub time: TimeOfDay,
    pub repeat_interval: TimeInterval,
    pub repeat_days: WeekdaySet,
    pub specific_date: Option<NaiveDate>,
    pub active: bool,
    pub snooze_duration: u16,
    pub ends_on: Option<NaiveDate>,
}

impl Reminder {
    /// Whether the reminder should have gone off by `now`.
    ///
    /// Active, the time of day reached, not past `ends_on`, and on the right
    /// day: the specific date if one is set, else one of the selected
    /// weekdays (no selection means every day).
    #[must_use]
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if !self.active || now.time() < self.time.time() {
            return false;
        }
        if self.ends_on.is_some_and(|ends_on| today > ends_on) {
            return false;
        }
        match self.specific_date {
            Some(date) => date == today,
            None => self.repeat_days.is_empty() || self.repeat_days.contains(today.weekday()),
        }
    }

    /// When a reminder that fired at `fired_at` and was snoozed comes back.
    #[must_use]
    pub fn snoozed_until(&self, fired_at: NaiveDateTime) -> NaiveDateTime {
        fired_at + TimeDelta::minutes(i64::from(self.snooze_duration))
    }

    /// The fields of this record without its id.
    #[must_use]
    pub fn to_new(&self) -> NewReminder {
        NewReminder {
            medication_id: self.medication_id,
            time: self.time,
            repeat_interval: self.repeat_interval,
            repeat_days: self.repeat_days,
            specific_date: self.specific_date,
            active: self.active,
            snooze_duration: self.snooze_duration,
            ends_on: self.ends_on,
        }
    }
}

// =============================================================================
// JOINED VIEW
// =============================================================================

/// A medication with its color and reminders resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationDetail {
    pub id: MedicationId,
    pub name: String,
    pub color: Option<ColorRecord>,
    pub dosage: u16,
    pub unit: String,
    pub frequency: u16,
    pub frequency_interval: TimeInterval,
    pub reminders: Vec<Reminder>,
}

impl MedicationDetail {
    /// Join a medication with its color and reminders (sorted by time, then id).
    #[must_use]
    pub fn assemble(medication: Medication, color: Option<ColorRecord>, mut reminders: Vec<Reminder>) -> Self {
        reminders.sort_by_key(|reminder| (reminder.time, reminder.id));
        Self {
            id: medication.id,
            name: medication.name,
            color,
            dosage: medication.dosage,
            unit: medication.unit,
            frequency: medication.frequency,
            frequency_interval: medication.frequency_interval,
            reminders,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
