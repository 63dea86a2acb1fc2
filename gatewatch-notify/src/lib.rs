pub mod dispatcher;
pub mod ops;

pub use dispatcher::{BoardingThreshold, NotificationDispatcher};
pub use ops::NotificationOps;
