//! Pure gating decisions. Nothing here performs I/O; callers fetch the state,
//! pass it in together with "now", and act on the returned decision.

mod admission;
mod review;

pub use admission::{Admission, AdmissionPolicy};
pub use review::{Availability, ReviewGate};
