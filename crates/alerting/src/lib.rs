//! Alert Debouncing
//!
//! Decides, per alert identity, whether and when a notification is sent.
//! Repeated alerts coalesce into one notification carrying the latest
//! payload, resolutions and recoveries cancel pending notifications, and
//! the number of pending identities is bounded.

mod config;
mod engine;
mod error;
pub mod event;
pub mod key;
mod scheduler;
mod table;

pub use config::{DebounceConfig, MAX_WINDOW_SECONDS};
pub use engine::{Debouncer, Decision, RejectReason, SuppressReason};
pub use error::AlertingError;
pub use event::{AlertData, AlertEvent, AlertTarget};
pub use key::{derive_key, AlertKey};
pub use scheduler::FiredAlert;
pub use table::PendingSnapshot;
