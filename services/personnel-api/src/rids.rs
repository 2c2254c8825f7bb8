//! Reservist Information Data Sheet sections and completeness rules.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RidsError {
    #[error("unknown RIDS section '{0}'")]
    UnknownSection(String),
    #[error("section '{0}' must be a JSON object")]
    NotAnObject(RidsSection),
    #[error("field '{field}' in section '{section}' must be a string")]
    NotAString { section: RidsSection, field: String },
    #[error("field '{field}' in section '{section}' must be a date (YYYY-MM-DD)")]
    InvalidDate { section: RidsSection, field: String },
    #[error("section '{0}' must hold an 'entries' array of objects")]
    InvalidEntries(RidsSection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidsSection {
    Personal,
    Contact,
    Military,
    Education,
    TrainingHistory,
    Awards,
    EmergencyContact,
}

impl RidsSection {
    pub const ALL: [RidsSection; 7] = [
        RidsSection::Personal,
        RidsSection::Contact,
        RidsSection::Military,
        RidsSection::Education,
        RidsSection::TrainingHistory,
        RidsSection::Awards,
        RidsSection::EmergencyContact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RidsSection::Personal => "personal",
            RidsSection::Contact => "contact",
            RidsSection::Military => "military",
            RidsSection::Education => "education",
            RidsSection::TrainingHistory => "training_history",
            RidsSection::Awards => "awards",
            RidsSection::EmergencyContact => "emergency_contact",
        }
    }

    /// Fields that must be filled before the sheet can be submitted. Empty
    /// for list sections, which are optional.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            RidsSection::Personal => &[
                "first_name",
                "last_name",
                "birth_date",
                "birth_place",
                "sex",
                "civil_status",
            ],
            RidsSection::Contact => &["address", "mobile", "email"],
            RidsSection::Military => &["service_number", "rank", "branch", "date_of_enlistment"],
            RidsSection::EmergencyContact => &["name", "relationship", "mobile"],
            RidsSection::Education | RidsSection::TrainingHistory | RidsSection::Awards => &[],
        }
    }

    fn date_fields(&self) -> &'static [&'static str] {
        match self {
            RidsSection::Personal => &["birth_date"],
            RidsSection::Military => &["date_of_enlistment"],
            _ => &[],
        }
    }

    pub fn is_required(&self) -> bool {
        !self.required_fields().is_empty()
    }

    fn is_list(&self) -> bool {
        matches!(
            self,
            RidsSection::Education | RidsSection::TrainingHistory | RidsSection::Awards
        )
    }
}

impl fmt::Display for RidsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RidsSection {
    type Err = RidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RidsSection::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| RidsError::UnknownSection(s.to_string()))
    }
}

/// Structural checks applied on every save. Drafts may be incomplete but
/// whatever is present must be well formed.
pub fn validate_section(section: RidsSection, payload: &Value) -> Result<(), RidsError> {
    let object = payload
        .as_object()
        .ok_or(RidsError::NotAnObject(section))?;

    if section.is_list() {
        let entries = object
            .get("entries")
            .and_then(Value::as_array)
            .ok_or(RidsError::InvalidEntries(section))?;
        if !entries.iter().all(Value::is_object) {
            return Err(RidsError::InvalidEntries(section));
        }
        return Ok(());
    }

    for field in section.required_fields() {
        match object.get(*field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(RidsError::NotAString {
                    section,
                    field: field.to_string(),
                })
            }
        }
    }

    for field in section.date_fields() {
        if let Some(raw) = object.get(*field).and_then(Value::as_str) {
            if !raw.trim().is_empty() && NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_err() {
                return Err(RidsError::InvalidDate {
                    section,
                    field: field.to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn missing_fields(section: RidsSection, payload: Option<&Value>) -> Vec<&'static str> {
    section
        .required_fields()
        .iter()
        .copied()
        .filter(|field| {
            payload
                .and_then(|p| p.get(*field))
                .and_then(Value::as_str)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub complete: bool,
    /// Share of required fields filled, 0..=100.
    pub percent: u8,
    pub missing: BTreeMap<RidsSection, Vec<String>>,
}

pub fn completeness(sections: &Map<String, Value>) -> Completeness {
    let mut missing = BTreeMap::new();
    let mut required_total = 0usize;
    let mut filled = 0usize;

    for section in RidsSection::ALL.into_iter().filter(RidsSection::is_required) {
        let absent = missing_fields(section, sections.get(section.as_str()));
        required_total += section.required_fields().len();
        filled += section.required_fields().len() - absent.len();
        if !absent.is_empty() {
            missing.insert(section, absent.into_iter().map(String::from).collect());
        }
    }

    let percent = if required_total == 0 {
        100
    } else {
        ((filled * 100) / required_total) as u8
    };

    Completeness {
        complete: missing.is_empty(),
        percent,
        missing,
    }
}
