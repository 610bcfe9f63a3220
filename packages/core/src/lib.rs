//! Upload, review and subscription gating for the Anti-Matter IPA store.
//!
//! The crate is split into pure decision logic ([`policy`]) and the services
//! that fetch and persist the state those decisions run over ([`submission`],
//! [`billing`]). Every collaborator is a trait object so the services can run
//! against Postgres in production and against [`store::InMemoryStore`] in tests.

pub mod billing;
pub mod clock;
pub mod config;
pub mod model;
pub mod notify;
pub mod policy;
pub mod store;
pub mod submission;

pub use antimatter_types;
