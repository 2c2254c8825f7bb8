//! Shared test support for the battalion hub workspace.

pub mod harness;

pub use harness::{
    expect_ok, random_id, string_field, TestServer, SUPER_ADMIN_EMAIL, SUPER_ADMIN_ID,
};
