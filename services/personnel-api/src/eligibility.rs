//! Promotion eligibility scoring for reservists.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::training::AttendanceSummary;

const TIME_IN_RANK_WEIGHT: f64 = 40.0;
const TRAINING_HOURS_WEIGHT: f64 = 30.0;
const TRAININGS_WEIGHT: f64 = 15.0;
const DOCUMENTS_WEIGHT: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityThresholds {
    pub min_years_in_rank: f64,
    pub min_training_hours: f64,
    pub min_trainings: u32,
    pub min_verified_documents: u32,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            min_years_in_rank: 3.0,
            min_training_hours: 40.0,
            min_trainings: 2,
            min_verified_documents: 1,
        }
    }
}

impl EligibilityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_years_in_rank.is_finite() && self.min_years_in_rank > 0.0) {
            return Err("minimum years in rank must be positive".into());
        }
        if !(self.min_training_hours.is_finite() && self.min_training_hours > 0.0) {
            return Err("minimum training hours must be positive".into());
        }
        if self.min_trainings == 0 {
            return Err("minimum trainings must be positive".into());
        }
        if self.min_verified_documents == 0 {
            return Err("minimum verified documents must be positive".into());
        }
        Ok(())
    }

    pub fn evaluate(&self, inputs: &EligibilityInputs, today: NaiveDate) -> EligibilityReport {
        let years = inputs
            .date_of_rank
            .map(|since| years_between(since, today))
            .unwrap_or(0.0);

        let criteria = vec![
            Criterion::new(
                "time_in_rank",
                TIME_IN_RANK_WEIGHT,
                self.min_years_in_rank,
                round2(years),
            ),
            Criterion::new(
                "training_hours",
                TRAINING_HOURS_WEIGHT,
                self.min_training_hours,
                inputs.attendance.hours,
            ),
            Criterion::new(
                "trainings_attended",
                TRAININGS_WEIGHT,
                f64::from(self.min_trainings),
                f64::from(inputs.attendance.sessions),
            ),
            Criterion::new(
                "verified_documents",
                DOCUMENTS_WEIGHT,
                f64::from(self.min_verified_documents),
                f64::from(inputs.verified_documents),
            ),
        ];

        let total: f64 = criteria.iter().map(|c| c.points).sum();
        EligibilityReport {
            eligible: criteria.iter().all(|c| c.met),
            score: total.floor().clamp(0.0, 100.0) as u8,
            evaluated_on: today,
            criteria,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilityInputs {
    pub date_of_rank: Option<NaiveDate>,
    pub attendance: AttendanceSummary,
    pub verified_documents: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    pub name: &'static str,
    pub required: f64,
    pub actual: f64,
    pub met: bool,
    /// Score contribution, `weight * min(actual / required, 1)`.
    pub points: f64,
}

impl Criterion {
    fn new(name: &'static str, weight: f64, required: f64, actual: f64) -> Self {
        let ratio = if required > 0.0 {
            (actual / required).clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            name,
            required,
            actual,
            met: actual >= required,
            points: weight * ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub score: u8,
    pub evaluated_on: NaiveDate,
    pub criteria: Vec<Criterion>,
}

/// Whole calendar years plus the elapsed share of the current year.
fn years_between(since: NaiveDate, today: NaiveDate) -> f64 {
    if today <= since {
        return 0.0;
    }

    let anniversary = |years: u32| since.checked_add_months(Months::new(years * 12));
    let mut whole = u32::try_from(today.year() - since.year()).unwrap_or(0);
    while whole > 0 && anniversary(whole).map_or(true, |date| date > today) {
        whole -= 1;
    }

    let (Some(last), Some(next)) = (anniversary(whole), anniversary(whole + 1)) else {
        return f64::from(whole);
    };
    let span = (next - last).num_days().max(1) as f64;
    f64::from(whole) + (today - last).num_days() as f64 / span
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
