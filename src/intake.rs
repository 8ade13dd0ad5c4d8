//! Capture intake: payload validation and the coordinator that turns a trigger
//! into a stored, indexed capture.

pub mod coordinator;
pub mod types;


pub use coordinator::{AcquiredCapture, IntakeCoordinator};
pub use types::{Outcome, Trigger, TriggerPayload};
