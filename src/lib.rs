pub mod capture_device;
pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod intake;
pub mod storage;
pub mod web_interface;

pub use controller::Controller;
pub use intake::{IntakeCoordinator, Outcome, TriggerPayload};
