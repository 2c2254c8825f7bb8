#![allow(dead_code)]

mod common;
pub use common::*;

mod audit_trail_tests;
mod communication_tests;
mod company_isolation_tests;
mod onboarding_tests;
mod readiness_tests;
mod rids_workflow_tests;
