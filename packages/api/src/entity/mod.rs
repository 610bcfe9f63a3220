//! SeaORM entities for the store tables.
//!
//! Column names follow the existing snake_case schema; the DDL that creates
//! the tables on start-up lives in `store::postgres`.

pub mod prelude;

pub mod app;
pub mod developer_device_usage;
pub mod developer_subscription;
pub mod push_token;
