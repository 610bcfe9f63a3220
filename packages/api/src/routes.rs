use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod apps;
pub mod developer;
pub mod health;
pub mod push;
pub mod webhook;

/// Success envelope shared by the store endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
