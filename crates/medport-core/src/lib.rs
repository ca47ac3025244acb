//! # MedPort Core
//!
//! The pure logic behind the MedPort medication tracker.
//!
//! This crate holds everything that does not need a network or a runtime:
//! - [`color`]: the hex/RGB synchronization rule
//! - [`schedule`]: intervals, weekday selections, time of day
//! - [`submission`], [`validation`], [`form`]: the medication form and its schema
//! - [`model`], [`storage`]: stored records and the store backends
//!
//! The HTTP server, the CLI and the client live in other crates and use these
//! types unchanged.

pub mod color;
pub mod form;
pub mod model;
pub mod schedule;
pub mod storage;
pub mod submission;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use color::{Channel, ColorFields, Rgb, hex_to_rgb, is_valid_hex, parse_hex, rgb_to_hex};
pub use form::MedicationForm;
pub use model::{
    ColorRecord, Medication, MedicationDetail, MedicationPatch, NewColor, NewMedication,
    NewReminder, Reminder,
};
pub use schedule::{TimeInterval, TimeOfDay, WeekdaySet};
pub use storage::{MedicationStore, MemoryStore, RedbStore};
pub use submission::{MedicationInput, ReminderInput};
pub use validation::{FieldError, ValidationErrors};

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a stored medication.
    MedicationId
);
record_id!(
    /// Identifier of a stored color.
    ColorId
);
record_id!(
    /// Identifier of a stored reminder.
    ReminderId
);

// =============================================================================
// ERROR TYPE
// =============================================================================

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Color,
    Medication,
    Reminder,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Color => "color",
            Self::Medication => "medication",
            Self::Reminder => "reminder",
        })
    }
}

/// Errors from MedPort core operations.
#[derive(Debug, Error)]
pub enum MedportError {
    /// Input failed the validation schema.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: u64 },

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),
}

impl MedportError {
    /// Shorthand for a missing record.
    pub fn not_found(kind: RecordKind, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Wrap any backend error as a storage error.
    pub fn storage(err: impl fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, MedportError>;
