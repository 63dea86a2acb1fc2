pub mod changes;
pub mod resolver;
pub mod service;

pub use changes::{detect_changes, StatusChange};
pub use resolver::StatusResolver;
pub use service::{FlightTracker, StatusView, TimeUntil};
