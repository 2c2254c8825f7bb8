//! Status vocabularies stored as text columns.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind} '{value}'; expected one of: {expected}")]
pub struct InvalidVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const EXPECTED: &'static str = concat!($($text, " "),+);

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(InvalidVariant {
                        kind: $kind,
                        value: other.to_string(),
                        expected: $name::EXPECTED.trim_end(),
                    }),
                }
            }
        }

        impl From<$name> for rusqlite::types::Value {
            fn from(value: $name) -> Self {
                rusqlite::types::Value::Text(value.as_str().to_string())
            }
        }
    };
}

text_enum!(AccountStatus, "account status", {
    Active => "active",
    Deactivated => "deactivated",
});

text_enum!(MobilizationStatus, "mobilization status", {
    Ready => "ready",
    Standby => "standby",
    Inactive => "inactive",
});

text_enum!(DocumentStatus, "document status", {
    Pending => "pending",
    Verified => "verified",
    Rejected => "rejected",
});

text_enum!(SessionStatus, "session status", {
    Scheduled => "scheduled",
    Ongoing => "ongoing",
    Completed => "completed",
    Cancelled => "cancelled",
});

text_enum!(RegistrationStatus, "registration status", {
    Registered => "registered",
    Attended => "attended",
    Absent => "absent",
    Cancelled => "cancelled",
});

text_enum!(
    /// Declaration order is display order, most pressing last.
    Priority, "priority", {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

text_enum!(RidsStatus, "RIDS status", {
    Draft => "draft",
    Submitted => "submitted",
    Approved => "approved",
    Returned => "returned",
});

impl SessionStatus {
    /// Sessions that still accept registrations.
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::Ongoing)
    }
}

impl RidsStatus {
    /// Whether the owning reservist may still edit sections.
    pub fn is_editable(&self) -> bool {
        matches!(self, RidsStatus::Draft | RidsStatus::Returned)
    }
}
