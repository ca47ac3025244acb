//! # Submission Body
//!
//! The JSON body the medication form sends to `POST /api/medications`,
//! and the schema it is checked against before it is sent (and again when
//! the server receives it).
//!
//! Numeric fields are kept as wide signed integers so that out-of-range
//! user input survives until validation reports it.

use crate::color::{ColorFields, is_valid_hex};
use crate::schedule::{TimeInterval, TimeOfDay, WeekdaySet};
use crate::validation::ValidationErrors;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// MESSAGES
// =============================================================================

pub const MSG_NAME_REQUIRED: &str = "Medication name is required";
pub const MSG_NAME_TOO_LONG: &str = "Medication name must be at most 255 characters";
pub const MSG_COLOR_NAME_REQUIRED: &str = "Color name is required";
pub const MSG_INVALID_HEX: &str = "Invalid hex color";
pub const MSG_COLOR_MISMATCH: &str = "Color hex and RGB values disagree";
pub const MSG_FREQUENCY_POSITIVE: &str = "Frequency must be positive";
pub const MSG_FREQUENCY_TOO_LARGE: &str = "Frequency is too large";
pub const MSG_INVALID_TIME: &str = "Invalid time format";
pub const MSG_SNOOZE_POSITIVE: &str = "Snooze duration must be positive";
pub const MSG_SNOOZE_TOO_LARGE: &str = "Snooze duration is too large";

/// Longest accepted medication or color name, in characters.
pub const MAX_NAME_CHARS: usize = 255;

// =============================================================================
// BODY TYPES
// =============================================================================

/// One reminder sub-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInput {
    /// `HH:MM`, 24-hour.
    pub time: String,
    pub repeat_interval: TimeInterval,
    #[serde(default)]
    pub repeat_days: WeekdaySet,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "calendar_date"
    )]
    pub specific_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Minutes.
    pub snooze_duration: i64,
}

impl Default for ReminderInput {
    fn default() -> Self {
        Self {
            time: "09:00".to_string(),
            repeat_interval: TimeInterval::Days,
            repeat_days: WeekdaySet::empty(),
            specific_date: None,
            active: true,
            snooze_duration: 5,
        }
    }
}

/// The whole medication form as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationInput {
    pub name: String,
    pub color: ColorFields,
    pub frequency: i64,
    pub frequency_interval: TimeInterval,
    #[serde(default)]
    pub reminders: Vec<ReminderInput>,
}

impl Default for MedicationInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: ColorFields::default(),
            frequency: 1,
            frequency_interval: TimeInterval::Days,
            reminders: vec![ReminderInput::default()],
        }
    }
}

fn default_active() -> bool {
    true
}

/// Only a calendar date, `YYYY-MM-DD`. A timestamp is refused: its date
/// depends on a time zone the server does not know.
fn calendar_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("invalid date '{}', expected YYYY-MM-DD", text)))
}

// =============================================================================
// SCHEMA
// =============================================================================

impl ReminderInput {
    /// Check this reminder, reporting paths under `reminders.{index}`.
    pub fn validate_into(&self, index: usize, errors: &mut ValidationErrors) {
        let path = |field: &str| format!("reminders.{}.{}", index, field);

        errors.check(TimeOfDay::parse(&self.time).is_none(), path("time"), MSG_INVALID_TIME);
        errors.check(self.snooze_duration < 1, path("snoozeDuration"), MSG_SNOOZE_POSITIVE);
        errors.check(
            self.snooze_duration > i64::from(u16::MAX),
            path("snoozeDuration"),
            MSG_SNOOZE_TOO_LARGE,
        );
    }
}

impl MedicationInput {
    /// Run the full schema, collecting every failure.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(self.name.trim().is_empty(), "name", MSG_NAME_REQUIRED);
        errors.check(self.name.chars().count() > MAX_NAME_CHARS, "name", MSG_NAME_TOO_LONG);

        errors.check(self.color.name.trim().is_empty(), "color.name", MSG_COLOR_NAME_REQUIRED);
        if !is_valid_hex(&self.color.hex) {
            errors.add("color.hex", MSG_INVALID_HEX);
        } else if !self.color.is_synchronized() {
            errors.add("color", MSG_COLOR_MISMATCH);
        }

        errors.check(self.frequency < 1, "frequency", MSG_FREQUENCY_POSITIVE);
        errors.check(self.frequency > i64::from(u16::MAX), "frequency", MSG_FREQUENCY_TOO_LARGE);

        for (index, reminder) in self.reminders.iter().enumerate() {
            reminder.validate_into(index, &mut errors);
        }

        errors.into_result(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    fn valid_input() -> MedicationInput {
        MedicationInput {
            name: "Ibuprofen".to_string(),
            color: ColorFields::from_rgb("White", Rgb::new(255, 255, 255)),
            ..MedicationInput::default()
        }
    }

    #[test]
    fn valid_input_passes() {
        assert_eq!(valid_input().validate(), Ok(()));
    }

    #[test]
    fn default_input_misses_both_names() {
        let errors = MedicationInput::default().validate().err().unwrap_or_default();
        let map = errors.to_map();
        assert_eq!(map.get("name"), Some(&vec![MSG_NAME_REQUIRED.to_string()]));
        assert_eq!(map.get("color.name"), Some(&vec![MSG_COLOR_NAME_REQUIRED.to_string()]));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn collects_every_failure() {
        let mut input = valid_input();
        input.color.set_hex("#12345");
        input.frequency = 0;
        input.reminders[0].time = "25:00".to_string();
        input.reminders.push(ReminderInput {
            snooze_duration: 0,
            ..ReminderInput::default()
        });

        let errors = input.validate().err().unwrap_or_default();
        let map = errors.to_map();
        assert!(map.contains_key("color.hex"));
        assert!(map.contains_key("frequency"));
        assert!(map.contains_key("reminders.0.time"));
        assert!(map.contains_key("reminders.1.snoozeDuration"));
        assert!(!map.contains_key("reminders.1.time"));
    }

    #[test]
    fn hand_edited_channels_are_a_mismatch() {
        let mut input = valid_input();
        input.color.red = 0;

        let errors = input.validate().err().unwrap_or_default();
        assert_eq!(errors.messages_for("color").collect::<Vec<_>>(), vec![MSG_COLOR_MISMATCH]);
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(valid_input()).expect("serialize");
        assert_eq!(json["frequencyInterval"], "days");
        assert_eq!(json["color"]["hex"], "#ffffff");
        assert_eq!(json["reminders"][0]["snoozeDuration"], 5);
        assert_eq!(json["reminders"][0]["repeatDays"], serde_json::json!([]));
        assert!(json["reminders"][0].get("specificDate").is_none());
    }

    #[test]
    fn specific_date_is_a_calendar_date() {
        let json = r#"{
            "time": "08:30",
            "repeatInterval": "weeks",
            "repeatDays": ["1"],
            "specificDate": "2026-10-20",
            "active": false,
            "snoozeDuration": 10
        }"#;
        let reminder: ReminderInput = serde_json::from_str(json).expect("deserialize");
        assert_eq!(reminder.specific_date, NaiveDate::from_ymd_opt(2026, 10, 20));
        assert!(!reminder.active);

        // 23:30 in UTC-05:00 is the 21st in UTC: there is no single date to pick.
        for timestamp in ["2026-10-21T04:30:00.000Z", "2026-10-20T23:30:00-05:00"] {
            let body = json.replace("2026-10-20", timestamp);
            let error = serde_json::from_str::<ReminderInput>(&body).err().map(|e| e.to_string());
            assert!(error.is_some_and(|e| e.contains("expected YYYY-MM-DD")), "{}", timestamp);
        }

        let null: ReminderInput = serde_json::from_str(
            r#"{"time":"08:30","repeatInterval":"days","specificDate":null,"snoozeDuration":1}"#,
        )
        .expect("deserialize");
        assert_eq!(null.specific_date, None);

        let plain: ReminderInput = serde_json::from_str(
            r#"{"time":"08:30","repeatInterval":"days","specificDate":"2026-01-02","snoozeDuration":1}"#,
        )
        .expect("deserialize");
        assert_eq!(plain.specific_date, NaiveDate::from_ymd_opt(2026, 1, 2));
        assert!(plain.active);
    }
}
