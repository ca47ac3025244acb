//! # Schedule Types
//!
//! The small value types a medication schedule is built from.
//!
//! - [`TimeInterval`]: hours / days / weeks / months
//! - [`TimeOfDay`]: a 24-hour `HH:MM` time
//! - [`WeekdaySet`]: a subset of Sunday..Saturday
//!
//! All three serialize as plain strings (or a list of strings) so the same
//! representation works for the JSON wire format and for postcard storage.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// TIME INTERVAL
// =============================================================================

/// The unit a frequency or a repeat is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInterval {
    Hours,
    #[default]
    Days,
    Weeks,
    Months,
}

impl TimeInterval {
    /// All intervals in display order.
    pub const ALL: [Self; 4] = [Self::Hours, Self::Days, Self::Weeks, Self::Months];

    /// The wire name (`"days"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
        }
    }

    /// The singular unit used in summaries (`"day"`).
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Hours => "hour",
            Self::Days => "day",
            Self::Weeks => "week",
            Self::Months => "month",
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|interval| interval.as_str() == lower || interval.unit() == lower)
            .ok_or_else(|| format!("unknown interval '{}' (expected hours, days, weeks or months)", s))
    }
}

// =============================================================================
// TIME OF DAY
// =============================================================================

/// A reminder time with minute precision.
///
/// Accepts `H:MM` or `HH:MM` with hours 0-23; always prints `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Create from hour and minute. Returns `None` when out of range.
    #[must_use]
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse the form's time format.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (hour, minute) = text.split_once(':')?;

        let hour_ok = (1..=2).contains(&hour.len()) && hour.bytes().all(|b| b.is_ascii_digit());
        let minute_ok = minute.len() == 2 && minute.bytes().all(|b| b.is_ascii_digit());
        if !hour_ok || !minute_ok {
            return None;
        }

        let hour: u32 = hour.parse().ok()?;
        let minute: u32 = minute.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Self::new(hour, minute)
    }

    /// The underlying time (seconds are always zero).
    #[must_use]
    pub fn time(&self) -> NaiveTime {
        self.0
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    #[must_use]
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid time of day '{}'", value))
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

// =============================================================================
// WEEKDAY SET
// =============================================================================

/// Weekdays indexed from Sunday, matching the form's checkbox values.
const DAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A subset of the seven weekdays.
///
/// Serializes as sorted index strings, `"0"` (Sunday) to `"6"` (Saturday).
/// Deserialization also accepts English day names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    /// Flip a checkbox.
    pub fn toggle(&mut self, day: Weekday) {
        self.0 ^= Self::bit(day);
    }

    #[must_use]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Selected days, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        DAYS.into_iter().filter(|day| self.contains(*day))
    }

    /// Parse one day token: an index `"0"`..`"6"` or an English name.
    #[must_use]
    pub fn parse_day(token: &str) -> Option<Weekday> {
        let token = token.trim();
        if let Ok(index) = token.parse::<usize>() {
            return DAYS.get(index).copied();
        }
        token.parse::<Weekday>().ok()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl TryFrom<Vec<String>> for WeekdaySet {
    type Error = String;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        tokens
            .iter()
            .map(|token| Self::parse_day(token).ok_or_else(|| format!("invalid weekday '{}'", token)))
            .collect()
    }
}

impl From<WeekdaySet> for Vec<String> {
    fn from(set: WeekdaySet) -> Self {
        set.iter()
            .map(|day| day.num_days_from_sunday().to_string())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parsing_and_names() {
        assert_eq!("days".parse::<TimeInterval>(), Ok(TimeInterval::Days));
        assert_eq!("Week".parse::<TimeInterval>(), Ok(TimeInterval::Weeks));
        assert!("fortnight".parse::<TimeInterval>().is_err());
        assert_eq!(TimeInterval::Months.unit(), "month");
        assert_eq!(TimeInterval::default(), TimeInterval::Days);
    }

    #[test]
    fn interval_serializes_lowercase() {
        let json = serde_json::to_string(&TimeInterval::Hours).expect("serialize");
        assert_eq!(json, "\"hours\"");
    }

    #[test]
    fn time_of_day_accepts_form_format() {
        assert_eq!(TimeOfDay::parse("09:00").map(|t| t.to_string()), Some("09:00".to_string()));
        assert_eq!(TimeOfDay::parse("9:05").map(|t| t.to_string()), Some("09:05".to_string()));
        assert_eq!(TimeOfDay::parse("23:59").map(|t| t.hour()), Some(23));
        assert!(TimeOfDay::parse("0:00").is_some());
    }

    #[test]
    fn time_of_day_rejects_bad_input() {
        for bad in ["24:00", "12:60", "12:5", "123:00", "12", ":30", "ab:cd", "12:00:00", " 9:00", "+9:00"] {
            assert!(TimeOfDay::parse(bad).is_none(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn weekday_set_membership() {
        let mut set = WeekdaySet::empty();
        assert!(set.is_empty());

        set.insert(Weekday::Mon);
        set.insert(Weekday::Sun);
        set.toggle(Weekday::Wed);
        set.toggle(Weekday::Wed);

        assert!(set.contains(Weekday::Mon));
        assert!(!set.contains(Weekday::Wed));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Weekday::Sun, Weekday::Mon]);
    }

    #[test]
    fn weekday_set_wire_format() {
        let set: WeekdaySet = serde_json::from_str(r#"["3", "Monday", "sun"]"#).expect("deserialize");
        assert_eq!(serde_json::to_string(&set).expect("serialize"), r#"["0","1","3"]"#);

        assert!(serde_json::from_str::<WeekdaySet>(r#"["7"]"#).is_err());
        assert!(serde_json::from_str::<WeekdaySet>(r#"["someday"]"#).is_err());
    }
}
