pub extern crate anyhow;
pub use anyhow::{Error, Result, anyhow, bail};
pub use serde_json::{self as json, Value};

pub mod utils;

/// Create a new opaque record id.
pub fn create_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
